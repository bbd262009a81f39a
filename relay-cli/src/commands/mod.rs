//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod run;

pub use job::JobCommands;
pub use run::OutputFormat;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use relay_core::domain::job::JobDefinition;
use relay_core::status::{StatusKind, StatusView};
use relay_runner::Session;

use crate::config::Config;
use crate::resolver::resolve_job;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Job discovery
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Run a job and print its results
    Run {
        /// Job ID, name or unambiguous ID prefix
        job: String,

        /// Input values as key=value pairs (e.g., -p query=rust -p maxPages=5)
        #[arg(short, long = "param", value_parser = run::parse_key_val)]
        params: Vec<(String, String)>,

        /// How to print the result records
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Jobs { command } => job::handle_job_command(command, config).await,
        Commands::Run {
            job,
            params,
            output,
        } => run::run_job(config, &job, params, output).await,
    }
}

/// Open a session and authenticate with the configured token
async fn open_session(config: &Config) -> Result<(Session, Vec<JobDefinition>)> {
    let session = Session::from_config(&config.runner)?;
    let jobs = session
        .authenticate(config.token()?)
        .await
        .context("Failed to fetch jobs")?;
    Ok((session, jobs))
}

/// Open a session and select the job the user named
async fn open_job(config: &Config, query: &str) -> Result<(Session, JobDefinition)> {
    let (session, jobs) = open_session(config).await?;
    let job = resolve_job(&jobs, query)?.clone();
    session
        .select_job(&job.id)
        .await
        .with_context(|| format!("Failed to load input schema of {}", job))?;
    Ok((session, job))
}

/// Colorize a status kind for display
fn colorize_kind(kind: StatusKind) -> ColoredString {
    let label = format!("{:<14}", kind.to_string());
    match kind {
        StatusKind::Idle => label.dimmed(),
        StatusKind::Authenticating | StatusKind::Listing | StatusKind::LoadingSchema => {
            label.yellow()
        }
        StatusKind::Running => label.cyan(),
        StatusKind::Succeeded => label.green(),
        StatusKind::Failed | StatusKind::Error => label.red(),
    }
}

/// Format a status view as one timestamped line
fn format_status(view: &StatusView) -> String {
    format!(
        "{} {} {}",
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
        colorize_kind(view.kind),
        view.message
    )
}
