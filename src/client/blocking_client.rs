//! Blocking Jenkins client.
//!
//! Requests are resolved against the client's base URL, or against a job or build URL
//! the server returned. Credentials go on every request. Statuses >= 400 become
//! [`Error::Auth`], [`Error::NotFound`] or [`Error::Api`] carrying a redacted body snippet.

use crate::{
    Auth, BodySnippetConfig, Error, HttpError, api,
    transport::{
        TransportRequest, TransportResponse,
        blocking_transport::{
            BlockingTransport, DynBlockingTransport, TransportOptions, UreqBlocking,
        },
        middleware::CrumbBlocking,
        request::Request,
    },
    util::{
        diagnostics,
        url::{endpoint_url, normalize_base_url, sanitize_url_for_error},
    },
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::field;
use url::Url;

/// Configures and constructs [`BlockingClient`].
pub struct BlockingClientBuilder {
    base_url: Url,
    auth: Option<Auth>,
    options: TransportOptions,
    crumb: bool,
    default_headers: HeaderMap,
    body_snippet: BodySnippetConfig,
    transport: Option<DynBlockingTransport>,
}

impl BlockingClientBuilder {
    fn try_new(base: &str) -> Result<Self, Error> {
        Ok(Self {
            base_url: normalize_base_url(base)?,
            auth: None,
            options: TransportOptions::default(),
            crumb: true,
            default_headers: HeaderMap::new(),
            body_snippet: BodySnippetConfig::default(),
            transport: None,
        })
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn auth_basic(self, user: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth(Auth::basic(user, token))
    }

    /// Anonymous access when `None`.
    pub fn maybe_auth(mut self, auth: Option<Auth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn no_system_proxy(mut self) -> Self {
        self.options.system_proxy = false;
        self
    }

    pub fn danger_accept_invalid_certs(mut self, yes: bool) -> Self {
        self.options.accept_invalid_certs = yes;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = ua.into();
        self
    }

    /// Per-request timeout, crumb fetches included. Defaults to 30 s.
    pub fn timeout(mut self, value: Duration) -> Self {
        self.options.timeout = value;
        self
    }

    pub fn connect_timeout(mut self, value: Duration) -> Self {
        self.options.connect_timeout = value;
        self
    }

    /// Send POSTs without asking the crumb issuer first.
    pub fn without_crumb(mut self) -> Self {
        self.crumb = false;
        self
    }

    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn capture_body_snippet(mut self, enabled: bool) -> Self {
        self.body_snippet.enabled = enabled;
        self
    }

    pub fn max_body_snippet_bytes(mut self, max_bytes: usize) -> Self {
        self.body_snippet.max_bytes = max_bytes;
        self
    }

    /// Replace the HTTP layer, e.g. with a scripted transport in tests. The crumb
    /// middleware still wraps it unless [`without_crumb`](Self::without_crumb) is set.
    pub fn transport(mut self, transport: impl BlockingTransport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<BlockingClient, Error> {
        let mut transport: DynBlockingTransport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqBlocking::new(&self.options)),
        };

        if self.crumb {
            transport = Arc::new(CrumbBlocking::new(
                transport,
                self.base_url.clone(),
                self.auth.clone(),
                self.default_headers.clone(),
                self.options.timeout,
                self.body_snippet,
            ));
        }

        Ok(BlockingClient {
            inner: Arc::new(Inner {
                base: self.base_url,
                auth: self.auth,
                timeout: self.options.timeout,
                default_headers: self.default_headers,
                body_snippet: self.body_snippet,
                transport,
            }),
        })
    }
}

/// Cheap to clone; clones share the transport and its cookie store.
#[derive(Clone)]
pub struct BlockingClient {
    inner: Arc<Inner>,
}

struct Inner {
    base: Url,
    auth: Option<Auth>,
    timeout: Duration,
    default_headers: HeaderMap,
    body_snippet: BodySnippetConfig,
    transport: DynBlockingTransport,
}

impl BlockingClient {
    pub fn builder(base: impl AsRef<str>) -> Result<BlockingClientBuilder, Error> {
        BlockingClientBuilder::try_new(base.as_ref())
    }

    pub fn new(base: impl AsRef<str>) -> Result<Self, Error> {
        Self::builder(base)?.build()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    #[must_use]
    pub fn jobs(&self) -> api::JobsService {
        api::JobsService::new(self.clone())
    }

    #[must_use]
    pub fn queue(&self) -> api::QueueService {
        api::QueueService::new(self.clone())
    }

    #[must_use]
    pub fn computers(&self) -> api::ComputersService {
        api::ComputersService::new(self.clone())
    }

    fn resolve(&self, req: &Request) -> Result<Url, Error> {
        let base = req.base.as_ref().unwrap_or(&self.inner.base);
        endpoint_url(base, req.segments.iter().map(String::as_str))
    }

    pub(crate) fn send_json<T: DeserializeOwned>(&self, req: Request) -> Result<T, Error> {
        let (url, resp) = self.execute(&req)?;
        resp.json().map_err(|source| Error::Decode {
            status: resp.status,
            method: req.method,
            path: url.path().into(),
            request_id: diagnostics::request_id(&resp.headers),
            body_snippet: self.snippet(&resp.body),
            source: Box::new(source),
        })
    }

    pub(crate) fn send_unit(&self, req: Request) -> Result<(), Error> {
        self.execute(&req).map(|_| ())
    }

    fn snippet(&self, body: &[u8]) -> Option<Box<str>> {
        diagnostics::body_snippet(body, self.inner.body_snippet, self.inner.auth.as_ref())
    }

    fn execute(&self, req: &Request) -> Result<(Url, TransportResponse), Error> {
        let url = self.resolve(req)?;

        let mut headers = self.inner.default_headers.clone();
        if let Some(auth) = &self.inner.auth {
            auth.apply(&mut headers)?;
        }

        let span = tracing::info_span!(
            "jenkins.request",
            http.method = %req.method,
            http.url = %sanitize_url_for_error(&url),
            http.status = field::Empty,
            request_id = field::Empty,
            elapsed_ms = field::Empty,
        );
        let _enter = span.enter();

        #[cfg(feature = "metrics")]
        let _in_flight = crate::transport::metrics::InFlight::enter();
        let started = Instant::now();

        let outcome = self
            .inner
            .transport
            .send(TransportRequest {
                method: req.method.clone(),
                url: url.clone(),
                headers,
                query: req.query.clone(),
                timeout: self.inner.timeout,
            })
            .and_then(|resp| self.reject_failure(&req.method, &url, resp));

        span.record("elapsed_ms", started.elapsed().as_millis() as u64);
        #[cfg(feature = "metrics")]
        crate::transport::metrics::observe(&req.method, &outcome, started.elapsed());

        match &outcome {
            Ok(resp) => {
                span.record("http.status", resp.status.as_u16());
                if let Some(rid) = diagnostics::request_id(&resp.headers) {
                    span.record("request_id", field::display(rid));
                }
            }
            Err(err) => {
                if let Some(status) = err.status() {
                    span.record("http.status", status.as_u16());
                }
                tracing::debug!(error = %err, "request failed");
            }
        }

        outcome.map(|resp| (url, resp))
    }

    fn reject_failure(
        &self,
        method: &Method,
        url: &Url,
        resp: TransportResponse,
    ) -> Result<TransportResponse, Error> {
        if !(resp.status.is_client_error() || resp.status.is_server_error()) {
            return Ok(resp);
        }

        let message = diagnostics::extract_message(&resp.body)
            .map(|msg| diagnostics::redact(&msg, self.inner.auth.as_ref()).into_boxed_str());
        Err(Error::from_http(HttpError {
            status: resp.status,
            method: method.clone(),
            url: Box::new(sanitize_url_for_error(url)),
            message,
            request_id: diagnostics::request_id(&resp.headers),
            body_snippet: self.snippet(&resp.body),
        }))
    }
}
