//! Scheduler layer
//!
//! This layer submits runs and drives their poll loop until the platform
//! reports a terminal status, then fetches the results. It owns the run
//! handle and status for the lifetime of a run.

pub mod poller;

pub use poller::{RunOrchestrator, RunOutcome, RunRequest, RunSnapshot};
