//! Trigger a job and report how its build ended.

use crate::{
    BlockingClient, BuildOutcome, Error, JobReference,
    plugin::{PerfDatum, Report, ServiceState},
    poll::CancelToken,
};
use std::time::Duration;

/// How the outcome of the triggered build is determined.
#[derive(Clone)]
pub enum Resolution {
    /// Poll the triggered build every `interval` until it finishes or `cancel` fires.
    Poll {
        interval: Duration,
        cancel: CancelToken,
    },
    /// Read the job's last completed build once; older than `window` counts as `TIMEOUT`.
    Delayed { window: Duration },
}

/// Trigger `job`, then resolve its outcome. A rejected trigger stops here, before any
/// outcome lookup.
pub fn execute(
    client: &BlockingClient,
    job: &JobReference,
    resolution: &Resolution,
) -> Result<BuildOutcome, Error> {
    let triggered = client.jobs().trigger(job)?;
    match resolution {
        Resolution::Poll { interval, cancel } => {
            client
                .jobs()
                .wait_for_completion(&triggered.build_url, *interval, cancel)
        }
        Resolution::Delayed { window } => {
            tracing::info!("delayed execution, retrieving last completed build");
            client.jobs().last_completed_within(job, *window)
        }
    }
}

/// Run the whole workflow and render its report. Never fails: errors become `FAILURE`.
pub fn check(client: &BlockingClient, job: &JobReference, resolution: &Resolution) -> Report {
    let result = execute(client, job, resolution);
    if let Err(err) = &result {
        tracing::error!(job = %job, error = %err, "job execution failed");
    }
    report(job, &result)
}

/// `OK` for a successful build, `FAIL` for any other result, `FAILURE` when no result
/// could be determined. Exit code 0 only for `OK`.
pub fn report(job: &JobReference, result: &Result<BuildOutcome, Error>) -> Report {
    let outcome = result.as_ref().ok();
    let report = match result {
        Ok(outcome) if outcome.is_success() => {
            Report::with_headline("OK", ServiceState::Ok).section([format!(
                "Job {job} build {} was successful",
                build_number(outcome)
            )])
        }
        Ok(outcome) => Report::with_headline("FAIL", ServiceState::Critical).section([format!(
            "Job {job} failed on build {} with error {}",
            build_number(outcome),
            outcome
                .result
                .as_ref()
                .map_or("unknown", |result| result.as_str())
        )]),
        Err(err) => Report::with_headline("FAILURE", ServiceState::Critical)
            .section([format!("Job {job} failed")])
            .section([format!("Exception: {err}")]),
    };

    let duration = match outcome.and_then(BuildOutcome::duration) {
        Some(duration) => PerfDatum::new("duration", duration.as_secs_f64()),
        None => PerfDatum::empty("duration"),
    };
    let success = u8::from(outcome.is_some_and(BuildOutcome::is_success));

    report
        .perf(duration)
        .perf(PerfDatum::new("success", success))
}

fn build_number(outcome: &BuildOutcome) -> String {
    outcome
        .number
        .map_or_else(|| "unknown".to_owned(), |n| n.to_string())
}
