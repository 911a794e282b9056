//! Jenkins monitoring checks with plugin-style output.
//!
//! * [`BlockingClient`] talks to the Jenkins JSON API (Basic auth, CSRF crumbs, TLS toggle).
//! * [`api::JobsService`] triggers parameterised builds and resolves their outcome, either
//!   by polling until the build finishes or by reading the last completed build once.
//! * [`checks`] turns server state into a [`plugin::Report`]: status headline, text,
//!   performance data and exit code.

pub mod api;
mod auth;
pub mod checks;
pub mod client;
mod error;
pub mod plugin;
pub mod poll;
pub mod transport;
pub mod types;
mod util;

pub use auth::{Auth, SecretString};
pub use client::{BlockingClient, BlockingClientBuilder};
pub use error::{BodySnippetConfig, Error, ErrorKind, HttpError, Result, TransportErrorKind};
pub use poll::{CancelToken, Pacer};
pub use types::*;
