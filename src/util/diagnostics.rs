//! Bits of a failed response worth putting into an error message.

use crate::{Auth, BodySnippetConfig};
use http::HeaderMap;

const REQUEST_ID_HEADERS: [&str; 3] = ["x-request-id", "x-correlation-id", "x-jenkins-session"];
const MESSAGE_KEYS: [&str; 2] = ["message", "error"];

fn non_empty(value: &str) -> Option<Box<str>> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.into())
}

pub(crate) fn request_id(headers: &HeaderMap) -> Option<Box<str>> {
    REQUEST_ID_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .and_then(non_empty)
    })
}

/// `message`/`error` of a JSON body. Jenkins' HTML error pages yield `None`.
pub(crate) fn extract_message(body: &[u8]) -> Option<Box<str>> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    MESSAGE_KEYS
        .iter()
        .find_map(|key| value.get(*key)?.as_str().and_then(non_empty))
}

/// Start of the body, cut at a char boundary, with the credential token masked.
pub(crate) fn body_snippet(
    body: &[u8],
    config: BodySnippetConfig,
    auth: Option<&Auth>,
) -> Option<Box<str>> {
    if !config.enabled || body.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(body);
    let head = truncate_utf8(&text, config.max_bytes);
    Some(redact(head, auth).into_boxed_str())
}

pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    let end = (0..=max_bytes.min(s.len()))
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..end]
}

pub(crate) fn redact(text: &str, auth: Option<&Auth>) -> String {
    match auth.map(Auth::secret) {
        Some(secret) if !secret.is_empty() => text.replace(secret, "<redacted>"),
        _ => text.to_owned(),
    }
}
