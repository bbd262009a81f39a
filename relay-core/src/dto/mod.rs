//! Data Transfer Objects for the platform API
//!
//! This module contains the JSON shapes exchanged with the remote platform.
//! Every response is wrapped in an [`Envelope`] carrying either `data` or an
//! `error` with a message.

pub mod job;
pub mod run;

use serde::{Deserialize, Serialize};

/// Response wrapper used by every platform endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// Error payload returned by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Remote error message, if the envelope carries one
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }
}
