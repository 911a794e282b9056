//! Shared request/response types.

pub mod common;
pub mod jobs;
pub mod system;

pub use common::*;
pub use jobs::*;
pub use system::*;
