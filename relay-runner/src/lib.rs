//! Relay Runner
//!
//! Drives jobs on the remote platform from discovery to results.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repository: Platform access behind a trait, backed by `relay-client`
//! - Scheduler: The run orchestrator and its poll loop
//! - Service: The session tying credential, job selection, form and runs together

pub mod config;
pub mod repository;
pub mod scheduler;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, OverlapPolicy};
pub use repository::{HttpPlatformRepository, PlatformRepository};
pub use scheduler::{RunOrchestrator, RunOutcome, RunRequest, RunSnapshot};
pub use service::Session;
