//! Core domain types
//!
//! This module contains the core domain structures used across Relay crates.
//! These types represent what the platform exposes (jobs, runs, results) and
//! what the form layer derives from a job's input schema.

pub mod credential;
pub mod field;
pub mod job;
pub mod run;
