//! Blocking CSRF-crumb middleware.
//!
//! Every non-`GET` request gets a freshly issued crumb. When the crumb issuer answers
//! with a non-success status the server is assumed to run without CSRF protection and
//! the request goes out without the header.

use crate::{
    Auth, BodySnippetConfig, Crumb, Error,
    transport::{TransportRequest, TransportResponse, blocking_transport::BlockingTransport},
    util::{diagnostics, url::endpoint_url},
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::time::Duration;
use url::Url;

/// Blocking wrapper that injects a crumb header.
#[derive(Clone)]
pub struct CrumbBlocking<T> {
    inner: T,
    base_url: Url,
    auth: Option<Auth>,
    default_headers: HeaderMap,
    fetch_timeout: Duration,
    body_snippet: BodySnippetConfig,
}

impl<T: BlockingTransport> CrumbBlocking<T> {
    pub fn new(
        inner: T,
        base_url: Url,
        auth: Option<Auth>,
        default_headers: HeaderMap,
        fetch_timeout: Duration,
        body_snippet: BodySnippetConfig,
    ) -> Self {
        Self {
            inner,
            base_url,
            auth,
            default_headers,
            fetch_timeout,
            body_snippet,
        }
    }

    /// `Ok(None)` when the server does not issue crumbs.
    fn fetch_crumb(&self) -> Result<Option<Crumb>, Error> {
        let url = endpoint_url(&self.base_url, ["crumbIssuer", "api", "json"])?;
        let path = url.path().to_string().into_boxed_str();

        let mut headers = self.default_headers.clone();
        if let Some(auth) = &self.auth {
            auth.apply(&mut headers)?;
        }

        let resp = self.inner.send(TransportRequest {
            method: Method::GET,
            url,
            headers,
            query: vec![],
            timeout: self.fetch_timeout,
        })?;

        if !resp.status.is_success() {
            tracing::debug!(
                status = resp.status.as_u16(),
                "crumb issuer unavailable, sending request without crumb"
            );
            return Ok(None);
        }

        resp.json::<Crumb>()
            .map(Some)
            .map_err(|err| Error::Decode {
                status: resp.status,
                method: Method::GET,
                path,
                request_id: diagnostics::request_id(&resp.headers),
                body_snippet: diagnostics::body_snippet(
                    &resp.body,
                    self.body_snippet,
                    self.auth.as_ref(),
                ),
                source: Box::new(err),
            })
    }
}

fn crumb_header(crumb: &Crumb) -> Result<(HeaderName, HeaderValue), Error> {
    let name = HeaderName::from_bytes(crumb.crumb_request_field.as_bytes()).map_err(|err| {
        Error::InvalidConfig {
            message: "invalid crumb header name".into(),
            source: Some(Box::new(err)),
        }
    })?;
    let value = HeaderValue::from_str(&crumb.crumb).map_err(|err| Error::InvalidConfig {
        message: "invalid crumb header value".into(),
        source: Some(Box::new(err)),
    })?;
    Ok((name, value))
}

impl<T: BlockingTransport> BlockingTransport for CrumbBlocking<T> {
    fn send(&self, mut req: TransportRequest) -> Result<TransportResponse, Error> {
        if req.method != Method::GET
            && let Some(crumb) = self.fetch_crumb()?
        {
            let (name, value) = crumb_header(&crumb)?;
            req.headers.insert(name, value);
        }

        self.inner.send(req)
    }
}
