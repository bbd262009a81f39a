//! Job resolver module
//!
//! Resolves what the user typed to a job definition. A job can be named by
//! its full id, its display name, or an unambiguous id prefix.

use anyhow::{Result, anyhow};
use relay_core::domain::job::JobDefinition;

/// Resolve a job id, name or id prefix
///
/// # Errors
/// Returns an error if:
/// - No job matches
/// - Several jobs match the prefix or the name (ambiguous)
pub fn resolve_job<'a>(jobs: &'a [JobDefinition], query: &str) -> Result<&'a JobDefinition> {
    if let Some(job) = jobs.iter().find(|job| job.id == query) {
        return Ok(job);
    }

    let named: Vec<_> = jobs
        .iter()
        .filter(|job| job.display_name.eq_ignore_ascii_case(query))
        .collect();
    match named.as_slice() {
        [job] => return Ok(*job),
        [] => {}
        _ => return Err(ambiguous(query, &named)),
    }

    let prefix = query.to_lowercase();
    let matches: Vec<_> = jobs
        .iter()
        .filter(|job| job.id.to_lowercase().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found matching '{}'", query)),
        [job] => Ok(*job),
        _ => Err(ambiguous(query, &matches)),
    }
}

fn ambiguous(query: &str, matches: &[&JobDefinition]) -> anyhow::Error {
    let ids: Vec<&str> = matches.iter().map(|job| job.id.as_str()).collect();
    anyhow!(
        "Ambiguous job '{}' matches multiple jobs: {}",
        query,
        ids.join(", ")
    )
}
