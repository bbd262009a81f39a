//! Configuration module
//!
//! Merges command-line flags over the runner's environment configuration.

use anyhow::{Context, Result};
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings handed to the session
    pub runner: relay_runner::Config,
    token: Option<String>,
}

impl Config {
    /// Build the configuration from flags, falling back to `RELAY_*` variables
    pub fn resolve(
        api_url: String,
        token: Option<String>,
        poll_interval: Option<u64>,
    ) -> Result<Self> {
        let mut runner = relay_runner::Config::from_env()?;
        runner.api_url = api_url;
        if let Some(seconds) = poll_interval {
            runner = runner.with_poll_interval(Duration::from_secs(seconds));
        }
        runner.validate().context("Invalid configuration")?;

        Ok(Self { runner, token })
    }

    /// The API token; every command needs one
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .context("An API token is required (use --token or RELAY_TOKEN)")
    }
}
