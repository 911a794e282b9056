use crate::poll::Pacer;
use crate::transport::request::Request;
use crate::{BuildOutcome, BuildUrl, Error, JobReference, TriggeredBuild};
use serde::Deserialize;
use std::time::{Duration, SystemTime};

/// Fields requested when reading a single build.
pub const BUILD_TREE: &str = "timestamp,result,number,duration,url";

/// Same fields, nested under the job's last completed build.
pub const LAST_COMPLETED_TREE: &str =
    "lastCompletedBuild[timestamp,result,number,duration,url]";

#[derive(Deserialize)]
struct BuildRef {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobSummary {
    #[serde(default)]
    last_build: Option<BuildRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastCompleted {
    #[serde(default)]
    last_completed_build: Option<BuildOutcome>,
}

/// Jenkins job and build APIs, addressed by absolute job/build URLs.
#[derive(Clone)]
pub struct JobsService {
    client: crate::BlockingClient,
}

impl JobsService {
    pub(crate) fn new(client: crate::BlockingClient) -> Self {
        Self { client }
    }
}

impl JobsService {
    /// Start a build of `job` and return the URL of the build it most likely created.
    ///
    /// The parameters are submitted as the query of
    /// `POST {job}/buildWithParameters`, with a generated `TASKID` when the caller
    /// did not set one. The build URL is the job's `lastBuild` right after submission,
    /// which can point at someone else's build when the job is triggered concurrently.
    pub fn trigger(&self, job: &JobReference) -> Result<TriggeredBuild, Error> {
        let mut params = job.parameters().clone();
        let correlation_id = params.ensure_correlation_id();

        let req = Request::post(&["buildWithParameters"])
            .under(job.url())
            .params(params.iter());
        self.client.send_unit(req)?;
        tracing::info!(job = %job, correlation_id = %correlation_id, "build submitted");

        let build_url = self.last_build_url(job)?;
        tracing::info!(build = %build_url, "resolved triggered build");

        Ok(TriggeredBuild {
            correlation_id,
            build_url,
        })
    }

    /// `GET {job}/api/json` → `lastBuild.url`
    pub fn last_build_url(&self, job: &JobReference) -> Result<BuildUrl, Error> {
        let req = Request::get(&["api", "json"]).under(job.url());
        let summary: JobSummary = self.client.send_json(req)?;
        let last_build = summary.last_build.ok_or_else(|| Error::Protocol {
            path: job.url().path().into(),
            message: "job has no lastBuild".into(),
        })?;
        BuildUrl::parse(&last_build.url)
    }

    /// `GET {build}/api/json?tree=timestamp,result,number,duration,url`
    pub fn build_outcome(&self, build: &BuildUrl) -> Result<BuildOutcome, Error> {
        let req = Request::get(&["api", "json"])
            .under(build.as_url())
            .tree(BUILD_TREE);
        self.client.send_json(req)
    }

    /// Poll `build` until it reports a result, pausing `interval` through `pacer`
    /// between attempts.
    ///
    /// There is no retry limit here; the pacer decides when to give up. Request
    /// failures end the wait immediately.
    pub fn wait_for_completion(
        &self,
        build: &BuildUrl,
        interval: Duration,
        pacer: impl Pacer,
    ) -> Result<BuildOutcome, Error> {
        let mut polls = 0u64;
        loop {
            let outcome = self.build_outcome(build)?;
            polls += 1;
            if outcome.is_terminal() {
                tracing::info!(build = %build, polls, result = ?outcome.result, "build finished");
                return Ok(outcome);
            }
            tracing::info!(build = %build, polls, "waiting for result");
            pacer.pause(interval)?;
        }
    }

    /// `GET {job}/api/json?tree=lastCompletedBuild[...]`. `None` when the job never completed a build.
    pub fn last_completed_build(&self, job: &JobReference) -> Result<Option<BuildOutcome>, Error> {
        let req = Request::get(&["api", "json"])
            .under(job.url())
            .tree(LAST_COMPLETED_TREE);
        let summary: LastCompleted = self.client.send_json(req)?;
        Ok(summary.last_completed_build)
    }

    /// Single read of the last completed build; anything older than `window` (or no
    /// completed build at all) becomes the `TIMEOUT` sentinel.
    pub fn last_completed_within(
        &self,
        job: &JobReference,
        window: Duration,
    ) -> Result<BuildOutcome, Error> {
        let outcome = match self.last_completed_build(job)? {
            Some(outcome) => outcome.within_window(window, SystemTime::now()),
            None => BuildOutcome::timed_out(),
        };
        tracing::info!(job = %job, result = ?outcome.result, "last completed build");
        Ok(outcome)
    }
}
