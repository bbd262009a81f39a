//! Job command handlers
//!
//! Handles listing the jobs a token can see and showing a job's input form.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use relay_core::domain::field::FieldDescriptor;
use relay_core::domain::job::JobDefinition;
use relay_core::form::FormValues;

use super::{open_job, open_session};
use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List the jobs visible to the token
    List,
    /// Show the input fields of a job
    Schema {
        /// Job ID, name or unambiguous ID prefix
        job: String,
    },
}

/// Handle job commands
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    match command {
        JobCommands::List => list_jobs(config).await,
        JobCommands::Schema { job } => show_schema(config, &job).await,
    }
}

/// List all jobs
async fn list_jobs(config: &Config) -> Result<()> {
    let (session, jobs) = open_session(config).await?;

    if jobs.is_empty() {
        println!("{}", session.status().message.yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

/// Show the normalized input fields of a job
async fn show_schema(config: &Config, query: &str) -> Result<()> {
    let (session, job) = open_job(config, query).await?;
    let fields = session.fields().await;
    let form = session.form().await;

    println!("{}", format!("Input of {}:", job).bold());
    if fields.is_empty() {
        println!("  {}", session.status().message.yellow());
        return Ok(());
    }

    println!();
    for field in &fields {
        print_field(field, &form);
    }

    Ok(())
}

fn print_job_summary(job: &JobDefinition) {
    println!("  {} {}", "▸".cyan(), job.display_name.bold());
    println!("    ID: {}", job.id.dimmed());
}

/// Print a field with the value a run would start from
fn print_field(field: &FieldDescriptor, form: &FormValues) {
    let required = if field.required {
        " required".red().to_string()
    } else {
        String::new()
    };

    println!(
        "  {} {} ({}){}",
        "▸".cyan(),
        field.key.bold(),
        field.kind,
        required
    );
    if field.label != field.key {
        println!("    Label:   {}", field.label);
    }
    if let Some(help) = &field.help_text {
        println!("    Help:    {}", help.dimmed());
    }
    if let Some(value) = form.get(&field.key) {
        let text = value.display_text();
        if !text.is_empty() {
            println!("    Default: {}", text);
        }
    }
}
