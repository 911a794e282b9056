//! Internal helpers shared by the client and transport layers.

pub(crate) mod diagnostics;
pub(crate) mod url;
