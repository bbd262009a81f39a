//! Relay Core
//!
//! Core types and abstractions for running jobs on a remote execution platform.
//!
//! This crate contains:
//! - Domain types: Core business entities (JobDefinition, RunHandle, etc.)
//! - DTOs: Wire shapes of the platform API
//! - Form: Schema normalization and form state
//! - Status: Projection of session/run state onto user-visible statuses

pub mod domain;
pub mod dto;
pub mod error;
pub mod form;
pub mod status;

pub use error::{RelayError, Result};
