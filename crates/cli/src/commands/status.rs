use crate::client::RelayMuxClient;
use crate::OutputFormat;

pub async fn run(client: &RelayMuxClient, format: &OutputFormat) -> anyhow::Result<()> {
    let status = client.status().await?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => {
            println!("started at:       {}", status.started_at);
            println!("uptime:           {}s", status.uptime_seconds);
            println!("cluster position: {} of {} peers", status.cluster_position, status.peer_count);
            println!("active alerts:    {}", status.active_alert_count);
            println!("active groups:    {}", status.active_group_count);
            println!("config:           {}", serde_json::to_string_pretty(&status.config)?);
        }
    }
    Ok(())
}
