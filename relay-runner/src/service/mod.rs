//! Service layer
//!
//! Services contain the business logic a front-end drives: authenticating,
//! picking a job, editing its input and running it. They orchestrate the
//! repository and the run orchestrator and publish a status view on every
//! transition.

mod session;

pub use session::Session;
