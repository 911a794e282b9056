//! Small identifier types shared across the API surface.

use crate::{Error, util::url::normalize_base_url};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Opaque token injected into build parameters so a triggered build can be told apart
/// from other builds of the same job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Random 32 character lowercase hex token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Canonical URL of a single build (`.../job/<name>/<number>/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildUrl(Url);

impl BuildUrl {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        normalize_base_url(raw).map(Self)
    }

    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BuildUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
