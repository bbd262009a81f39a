//! Repository layer
//!
//! Repositories are stateless clients that abstract communication with the
//! platform. They provide a simple, focused interface without any business
//! logic and translate transport-level failures into the Relay error
//! taxonomy.
//!
//! The repository is trait-based to enable testing and mocking.

mod platform;

pub use platform::{HttpPlatformRepository, PlatformRepository};
