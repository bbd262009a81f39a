//! Relay CLI
//!
//! Command-line interface for discovering and running jobs on the platform.

mod commands;
mod config;
mod resolver;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Run platform jobs from the command line", long_about = None)]
struct Cli {
    /// Platform API URL
    #[arg(long, env = "RELAY_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// API token
    #[arg(long, env = "RELAY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between two status checks of a run
    #[arg(long)]
    poll_interval: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_cli=info,relay_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.api_url, cli.token, cli.poll_interval)?;

    handle_command(cli.command, &config).await
}
