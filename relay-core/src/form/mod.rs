//! Form layer
//!
//! Turns a job's raw input schema into typed field descriptors and keeps the
//! values a user enters for them until a run is submitted.

pub mod normalizer;
pub mod store;

pub use normalizer::normalize;
pub use store::{FieldValue, FormValues, StructuredValue};
