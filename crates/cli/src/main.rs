//! RelayMux CLI
//!
//! A command-line interface for interacting with a RelayMux server.

mod client;
mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use client::RelayMuxClient;

/// RelayMux CLI -- interact with a RelayMux alert gateway.
#[derive(Parser, Debug)]
#[command(name = "relaymux", version, about)]
struct Cli {
    /// RelayMux server endpoint URL.
    #[arg(long, env = "RELAYMUX_ENDPOINT", default_value = "http://localhost:9093", global = true)]
    endpoint: String,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check server health.
    Health,
    /// List current alerts.
    Alerts(commands::alerts::AlertsArgs),
    /// Manage silences.
    Silences(commands::silences::SilencesArgs),
    /// Show cluster and instance status.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let client = RelayMuxClient::new(&cli.endpoint);

    match cli.command {
        Command::Health => commands::health::run(&client).await,
        Command::Alerts(args) => commands::alerts::run(&client, &args, &cli.format).await,
        Command::Silences(args) => commands::silences::run(&client, &args, &cli.format).await,
        Command::Status => commands::status::run(&client, &cli.format).await,
    }
}
