use super::{TransportRequest, TransportResponse};
use crate::error::{Error, TransportErrorKind};
use http::{HeaderMap, Method};
use std::{io, sync::Arc, time::Duration};
use ureq::{Agent, RequestBuilder};

/// Trait implemented by any blocking HTTP layer.
pub trait BlockingTransport: Send + Sync + 'static {
    fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error>;
}

pub type DynBlockingTransport = Arc<dyn BlockingTransport>;

impl<T: BlockingTransport + ?Sized> BlockingTransport for Arc<T> {
    fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
        (**self).send(req)
    }
}

/// Agent settings shared by every request of a client.
#[derive(Clone, Debug)]
pub struct TransportOptions {
    pub user_agent: String,
    /// Upper bound for a whole request, unless the request sets its own.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Skip TLS certificate and host name verification.
    pub accept_invalid_certs: bool,
    /// Honour `HTTP(S)_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            accept_invalid_certs: false,
            system_proxy: true,
        }
    }
}

/// Default blocking transport built on `ureq`. Cookies persist for the agent's lifetime.
#[derive(Clone)]
pub struct UreqBlocking {
    agent: Agent,
}

impl UreqBlocking {
    #[must_use]
    pub fn new(options: &TransportOptions) -> Self {
        let mut config = Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(options.user_agent.as_str())
            .timeout_global(Some(options.timeout))
            .timeout_connect(Some(options.connect_timeout));

        if !options.system_proxy {
            config = config.proxy(None);
        }
        if options.accept_invalid_certs {
            config = config.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        Self {
            agent: Agent::new_with_config(config.build()),
        }
    }
}

fn prepare<B>(
    builder: RequestBuilder<B>,
    headers: &HeaderMap,
    query: Vec<(String, String)>,
    timeout: Duration,
) -> RequestBuilder<B> {
    let builder = headers
        .iter()
        .fold(builder.query_pairs(query), |b, (name, value)| {
            b.header(name, value)
        });
    builder.config().timeout_global(Some(timeout)).build()
}

fn classify(err: &ureq::Error) -> TransportErrorKind {
    match err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(io) => match io.kind() {
            io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => TransportErrorKind::Connect,
            _ => TransportErrorKind::Other,
        },
        _ => TransportErrorKind::Other,
    }
}

impl BlockingTransport for UreqBlocking {
    /// Only `GET` and body-less `POST` are needed to talk to Jenkins here.
    fn send(&self, req: TransportRequest) -> Result<TransportResponse, Error> {
        let TransportRequest {
            method,
            url,
            headers,
            query,
            timeout,
        } = req;

        let failed = |err: ureq::Error| Error::Transport {
            method: method.clone(),
            path: url.path().into(),
            kind: classify(&err),
            source: Box::new(err),
        };

        let mut response = match method {
            Method::GET => prepare(self.agent.get(url.as_str()), &headers, query, timeout).call(),
            Method::POST => {
                prepare(self.agent.post(url.as_str()), &headers, query, timeout).send_empty()
            }
            ref other => {
                return Err(Error::invalid_config(format!(
                    "unsupported HTTP method: {other}"
                )));
            }
        }
        .map_err(failed)?;

        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(failed)?;

        Ok(TransportResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body,
        })
    }
}
