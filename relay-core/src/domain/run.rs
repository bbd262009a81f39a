//! Run domain types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::RelayError;

/// Identifies one execution of a job
///
/// Created when a run is submitted and used as the key for status polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    pub run_id: String,
    pub owner_job_id: String,
}

/// Local projection of a run's remote state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl RunStatus {
    /// Classify a remote status token
    ///
    /// Only `SUCCEEDED`, `FAILED` and `ABORTED` are terminal; anything else
    /// (including statuses this crate has never seen) means still running.
    pub fn from_remote(token: &str) -> Self {
        match token {
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" => RunStatus::Failed,
            "ABORTED" => RunStatus::Aborted,
            _ => RunStatus::Running,
        }
    }

    /// Whether polling stops at this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// One status poll answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatusReport {
    pub status: RunStatus,
    /// Dataset holding the run output, once the platform knows it
    pub default_dataset_id: Option<String>,
}

/// Ordered output records of a succeeded run
pub type ResultSet = Vec<JsonValue>;

/// Lifecycle of a single run as driven by the orchestrator
///
/// `Done` and `Errored` are terminal. `Idle` is the state before any run and
/// after a run was cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    Submitting {
        job_id: String,
    },
    Polling {
        handle: RunHandle,
        /// Status checks answered so far
        attempts: u32,
    },
    FetchingResults {
        handle: RunHandle,
    },
    Done {
        handle: RunHandle,
        results: ResultSet,
    },
    Errored {
        handle: Option<RunHandle>,
        failure: RunFailure,
    },
}

impl RunState {
    /// Whether a run is in flight
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Submitting { .. } | RunState::Polling { .. } | RunState::FetchingResults { .. }
        )
    }

    /// Whether this state ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done { .. } | RunState::Errored { .. })
    }

    /// Handle of the run this state belongs to, once submitted
    pub fn handle(&self) -> Option<&RunHandle> {
        match self {
            RunState::Polling { handle, .. }
            | RunState::FetchingResults { handle }
            | RunState::Done { handle, .. } => Some(handle),
            RunState::Errored { handle, .. } => handle.as_ref(),
            RunState::Idle | RunState::Submitting { .. } => None,
        }
    }

    /// Fetched records; `None` until the run is done
    pub fn results(&self) -> Option<&ResultSet> {
        match self {
            RunState::Done { results, .. } => Some(results),
            _ => None,
        }
    }
}

/// Why a run ended in [`RunState::Errored`]
#[derive(Debug, Clone, PartialEq)]
pub enum RunFailure {
    /// Submission, polling or result retrieval failed on the remote side
    Remote(RelayError),
    /// The platform reported a failed or aborted run
    Finished(RunStatus),
    /// The run kept running past the configured number of status checks
    PollLimitExceeded { attempts: u32 },
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunFailure::Remote(err) => write!(f, "Failed to run job: {}", err.detail()),
            RunFailure::Finished(status) => write!(
                f,
                "Job run {}. Check the platform console for details.",
                status
            ),
            RunFailure::PollLimitExceeded { attempts } => write!(
                f,
                "Gave up waiting for the run after {} status checks.",
                attempts
            ),
        }
    }
}
