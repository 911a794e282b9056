//! Jenkins credentials: a user name plus a password or API token, sent as HTTP Basic auth.

use crate::Error;
use base64::{Engine, engine::general_purpose::STANDARD as B64};
use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use std::fmt;

/// Password or API token. Never printed.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct SecretString(Box<str>);

impl SecretString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().into_boxed_str())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretString").field(&"***").finish()
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Credentials attached to every request, including crumb fetches.
#[derive(Clone, Debug)]
pub struct Auth {
    user: String,
    token: SecretString,
}

impl Auth {
    #[must_use]
    pub fn basic(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: SecretString::new(token),
        }
    }

    /// Credentials from optional command-line/env values. Anonymous unless both the
    /// user (non-empty) and the token are given.
    #[must_use]
    pub fn from_parts(user: Option<String>, token: Option<String>) -> Option<Self> {
        let user = user.filter(|user| !user.is_empty())?;
        token.map(|token| Self::basic(user, token))
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The value that must never show up in logs or error text.
    pub(crate) fn secret(&self) -> &str {
        self.token.expose()
    }

    pub(crate) fn apply(&self, headers: &mut HeaderMap) -> Result<(), Error> {
        let encoded = B64.encode(format!("{}:{}", self.user, self.token.expose()));
        let mut value =
            HeaderValue::try_from(format!("Basic {encoded}")).map_err(|err| {
                Error::InvalidConfig {
                    message: "credentials cannot be sent as a header".into(),
                    source: Some(Box::new(err)),
                }
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}
