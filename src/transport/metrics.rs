//! Request metrics through the `metrics` facade (`metrics` feature).
//!
//! * `jenkins_check_requests_in_flight` gauge
//! * `jenkins_check_requests_total{method, outcome}` counter
//! * `jenkins_check_request_seconds{method, outcome}` histogram
//!
//! `outcome` is the status class (`2xx`, `4xx`, ...) or the error kind when no response
//! arrived.

use super::TransportResponse;
use crate::{Error, ErrorKind};
use http::Method;
use std::time::Duration;

pub(crate) struct InFlight(metrics::Gauge);

impl InFlight {
    pub(crate) fn enter() -> Self {
        let gauge = metrics::gauge!("jenkins_check_requests_in_flight");
        gauge.increment(1.0);
        Self(gauge)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.decrement(1.0);
    }
}

fn outcome_label(outcome: &Result<TransportResponse, Error>) -> &'static str {
    let status = match outcome {
        Ok(resp) => resp.status,
        Err(err) => match err.status() {
            Some(status) => status,
            None => return error_label(err.kind()),
        },
    };
    match status.as_u16() / 100 {
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        5 => "5xx",
        _ => "other",
    }
}

fn error_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Transport => "transport",
        ErrorKind::Decode => "decode",
        ErrorKind::InvalidConfig => "invalid_config",
        _ => "other",
    }
}

pub(crate) fn observe(
    method: &Method,
    outcome: &Result<TransportResponse, Error>,
    elapsed: Duration,
) {
    let method = method.as_str().to_owned();
    let outcome = outcome_label(outcome);
    metrics::counter!(
        "jenkins_check_requests_total",
        "method" => method.clone(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "jenkins_check_request_seconds",
        "method" => method,
        "outcome" => outcome
    )
    .record(elapsed);
}
