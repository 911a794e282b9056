//! Transport wrappers.

pub mod crumb_blocking;

pub use crumb_blocking::CrumbBlocking;
