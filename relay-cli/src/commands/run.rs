//! Run command handler
//!
//! Selects a job, applies the input values given on the command line, runs
//! it and streams every status change until the run ends.

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use colored::*;
use relay_core::domain::run::RunState;
use relay_runner::RunOutcome;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{format_status, open_job};
use crate::config::Config;

/// How result records are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON, one record after the other
    Pretty,
    /// The whole result set as a single JSON array
    Json,
}

/// Parse a single key=value pair
pub fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Run a job and print its results
pub async fn run_job(
    config: &Config,
    query: &str,
    params: Vec<(String, String)>,
    output: OutputFormat,
) -> Result<()> {
    let (session, job) = open_job(config, query).await?;

    for (key, value) in &params {
        session
            .edit_field(key, value)
            .await
            .with_context(|| format!("Invalid parameter '{}'", key))?;
    }

    // Status lines go to stderr so the records can be piped
    let mut statuses = session.subscribe();
    eprintln!("{}", format_status(&statuses.borrow_and_update()));
    let printer = tokio::spawn(async move {
        while statuses.changed().await.is_ok() {
            let line = format_status(&statuses.borrow_and_update());
            eprintln!("{}", line);
        }
    });

    debug!("Running {} with {} parameter(s)", job, params.len());
    for (key, value) in session.form().await.iter() {
        debug!("  {} ({}) = {}", key, value.kind(), value.display_text());
    }
    let outcome = session.run().await;

    // Closing the session lets the printer drain the last status and stop
    drop(session);
    printer.await.context("Status printer stopped unexpectedly")?;

    match outcome? {
        RunOutcome::Finished(RunState::Done { results, .. }) => print_results(&results, output),
        RunOutcome::Finished(RunState::Errored { failure, .. }) => bail!("{}", failure),
        RunOutcome::Finished(other) => bail!("Run ended in an unexpected state: {:?}", other),
        RunOutcome::Superseded => bail!("Run was cancelled"),
    }
}

fn print_results(results: &[JsonValue], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(results)?),
        OutputFormat::Pretty => {
            if results.is_empty() {
                eprintln!("{}", "The run produced no records.".yellow());
            }
            for record in results {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
        }
    }
    Ok(())
}
