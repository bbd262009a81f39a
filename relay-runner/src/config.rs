//! Runner configuration
//!
//! Defines all configurable parameters for talking to the platform and
//! driving runs: API location, poll cadence and limits, request timeouts.

use std::str::FromStr;
use std::time::Duration;

/// What happens when a run is requested while another one is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Invalidate the in-flight run; its late answers are discarded
    #[default]
    Supersede,
    /// Refuse the new run with a concurrent-run error
    Reject,
}

impl FromStr for OverlapPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supersede" => Ok(OverlapPolicy::Supersede),
            "reject" => Ok(OverlapPolicy::Reject),
            other => anyhow::bail!(
                "invalid run overlap policy '{}' (expected 'supersede' or 'reject')",
                other
            ),
        }
    }
}

impl std::fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlapPolicy::Supersede => write!(f, "supersede"),
            OverlapPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Runner configuration
///
/// All timeouts and intervals are configurable to allow tuning
/// for different platforms and networks.
#[derive(Debug, Clone)]
pub struct Config {
    /// Platform API base URL (e.g., "http://localhost:8080")
    pub api_url: String,

    /// Delay between two status checks of a run
    pub poll_interval: Duration,

    /// Status checks after which a still-running run is given up
    pub max_poll_attempts: u32,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,

    /// Maximum number of jobs requested when listing
    pub list_limit: usize,

    /// Behavior when a run is requested while one is in flight
    pub overlap_policy: OverlapPolicy,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 720, // one hour at the default interval
            request_timeout: Duration::from_secs(30),
            list_limit: 1000,
            overlap_policy: OverlapPolicy::Supersede,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - RELAY_API_URL (optional, default: http://localhost:8080)
    /// - RELAY_POLL_INTERVAL (optional, seconds, default: 5)
    /// - RELAY_MAX_POLL_ATTEMPTS (optional, default: 720)
    /// - RELAY_REQUEST_TIMEOUT (optional, seconds, default: 30)
    /// - RELAY_LIST_LIMIT (optional, default: 1000)
    /// - RELAY_RUN_OVERLAP (optional, supersede|reject, default: supersede)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_url = std::env::var("RELAY_API_URL").unwrap_or(defaults.api_url);

        let poll_interval = std::env::var("RELAY_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let max_poll_attempts = std::env::var("RELAY_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_poll_attempts);

        let request_timeout = std::env::var("RELAY_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let list_limit = std::env::var("RELAY_LIST_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.list_limit);

        let overlap_policy = match std::env::var("RELAY_RUN_OVERLAP") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.overlap_policy,
        };

        Ok(Self {
            api_url,
            poll_interval,
            max_poll_attempts,
            request_timeout,
            list_limit,
            overlap_policy,
        })
    }

    /// Sets the poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!("api_url cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_poll_attempts == 0 {
            anyhow::bail!("max_poll_attempts must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.list_limit == 0 {
            anyhow::bail!("list_limit must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8080".to_string())
    }
}
