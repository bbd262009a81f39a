//! Error taxonomy shared by every Relay component

use thiserror::Error;

/// Result type alias for Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur while discovering, configuring and running jobs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The platform rejected the credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Advisory: the listing succeeded but returned no jobs
    #[error("Authentication successful, but no jobs were found.")]
    EmptyResult,

    /// The input schema could not be interpreted
    #[error("Malformed input schema: {0}")]
    Schema(String),

    /// A field value cannot be coerced to its declared kind
    #[error("Invalid value for field '{key}': {reason}")]
    InvalidInput {
        /// Field key
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// An edit referenced a key outside the current schema
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The platform rejected the run submission
    #[error("Run submission rejected: {0}")]
    Submission(String),

    /// Network or decoding failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A run was requested without its prerequisites
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A run was requested while another one is still in flight
    #[error("A run is already in progress (run {0})")]
    ConcurrentRun(String),
}

impl RelayError {
    /// Create an invalid input error for a field
    pub fn invalid_input(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Message without the category prefix, for user-facing status lines
    ///
    /// Falls back to a generic message when the remote supplied none.
    pub fn detail(&self) -> String {
        let detail = match self {
            Self::Auth(msg)
            | Self::Schema(msg)
            | Self::Submission(msg)
            | Self::Transport(msg)
            | Self::Precondition(msg) => msg.clone(),
            other => other.to_string(),
        };
        if detail.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            detail
        }
    }
}
