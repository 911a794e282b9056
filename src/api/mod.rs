//! Jenkins API services.
//!
//! Exposed via service accessors on the client:
//! - `BlockingClient::jobs()`
//! - `BlockingClient::queue()`
//! - `BlockingClient::computers()`

pub mod computers;
pub mod jobs;
pub mod queue;

pub use computers::*;
pub use jobs::*;
pub use queue::*;
