//! Status projection
//!
//! Maps the phase a session is in (including the state of its current run)
//! onto the handful of statuses a front-end shows to the user. The mapping is
//! a pure function: it keeps no state of its own and is recomputed on every
//! transition.

use serde::Serialize;

use crate::domain::run::{RunFailure, RunState};
use crate::error::RelayError;

/// User-facing status category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusKind {
    Idle,
    Authenticating,
    Listing,
    LoadingSchema,
    Running,
    Succeeded,
    Failed,
    Error,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StatusKind::Idle => "idle",
            StatusKind::Authenticating => "authenticating",
            StatusKind::Listing => "listing",
            StatusKind::LoadingSchema => "loading-schema",
            StatusKind::Running => "running",
            StatusKind::Succeeded => "succeeded",
            StatusKind::Failed => "failed",
            StatusKind::Error => "error",
        };
        f.write_str(label)
    }
}

/// What a front-end displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub kind: StatusKind,
    /// Whether an operation is in progress
    pub loading: bool,
    pub message: String,
}

impl StatusView {
    fn new(kind: StatusKind, loading: bool, message: impl Into<String>) -> Self {
        Self {
            kind,
            loading,
            message: message.into(),
        }
    }
}

/// Session-level action that can fail outside of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    FetchJobs,
    FetchSchema,
}

impl std::fmt::Display for SessionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionAction::FetchJobs => write!(f, "fetch jobs"),
            SessionAction::FetchSchema => write!(f, "fetch input schema"),
        }
    }
}

/// Where a session currently is
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Authenticating,
    Listing,
    JobsLoaded { count: usize },
    LoadingSchema { job_id: String },
    /// `None` when the job publishes no schema at all
    SchemaLoaded { field_count: Option<usize> },
    Failed { action: SessionAction, error: RelayError },
    Run(RunState),
}

/// Project a session phase onto a status view
pub fn project(phase: &SessionPhase) -> StatusView {
    match phase {
        SessionPhase::Idle => StatusView::new(StatusKind::Idle, false, ""),
        SessionPhase::Authenticating => {
            StatusView::new(StatusKind::Authenticating, true, "Authenticating...")
        }
        SessionPhase::Listing => StatusView::new(StatusKind::Listing, true, "Fetching jobs..."),
        SessionPhase::JobsLoaded { count: 0 } => {
            StatusView::new(StatusKind::Idle, false, RelayError::EmptyResult.to_string())
        }
        SessionPhase::JobsLoaded { .. } => {
            StatusView::new(StatusKind::Idle, false, "Jobs loaded successfully.")
        }
        SessionPhase::LoadingSchema { .. } => {
            StatusView::new(StatusKind::LoadingSchema, true, "Fetching input schema...")
        }
        SessionPhase::SchemaLoaded {
            field_count: None | Some(0),
        } => StatusView::new(StatusKind::Idle, false, "This job takes no parameters."),
        SessionPhase::SchemaLoaded { .. } => {
            StatusView::new(StatusKind::Idle, false, "Input schema loaded.")
        }
        SessionPhase::Failed { action, error } => StatusView::new(
            StatusKind::Error,
            false,
            format!("Failed to {}: {}", action, error.detail()),
        ),
        SessionPhase::Run(state) => project_run(state),
    }
}

fn project_run(state: &RunState) -> StatusView {
    match state {
        RunState::Idle => StatusView::new(StatusKind::Idle, false, ""),
        RunState::Submitting { .. } => {
            StatusView::new(StatusKind::Running, true, "Executing job...")
        }
        RunState::Polling { handle, .. } => StatusView::new(
            StatusKind::Running,
            true,
            format!(
                "Run started with ID: {}. Waiting for results...",
                handle.run_id
            ),
        ),
        RunState::FetchingResults { .. } => StatusView::new(
            StatusKind::Succeeded,
            true,
            "Run succeeded! Fetching results...",
        ),
        RunState::Done { .. } => StatusView::new(StatusKind::Succeeded, false, "Run complete."),
        RunState::Errored { failure, .. } => {
            let kind = match failure {
                RunFailure::Finished(_) => StatusKind::Failed,
                RunFailure::Remote(_) | RunFailure::PollLimitExceeded { .. } => StatusKind::Error,
            };
            StatusView::new(kind, false, failure.to_string())
        }
    }
}
