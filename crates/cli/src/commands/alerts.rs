use clap::{Args, Subcommand};

use crate::client::RelayMuxClient;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AlertsCommand {
    /// List every alert the server currently holds, firing or resolved.
    List,
}

pub async fn run(client: &RelayMuxClient, args: &AlertsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        AlertsCommand::List => {
            let alerts = client.list_alerts().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&alerts)?),
                OutputFormat::Text => {
                    println!("{} alerts:", alerts.len());
                    for alert in &alerts {
                        let labels: Vec<String> = alert.labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
                        let state = if alert.ends_at.is_some_and(|e| e <= chrono::Utc::now()) { "resolved" } else { "firing" };
                        println!("  [{state}] {}", labels.join(", "));
                    }
                }
            }
        }
    }
    Ok(())
}
