use crate::{
    BuildUrl, CorrelationId, Error,
    util::url::{normalize_base_url, origin_url},
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use url::Url;

/// Parameter name that carries the correlation token of a triggered build.
pub const CORRELATION_PARAMETER: &str = "TASKID";

/// Final state reported by Jenkins for a build, plus the synthetic [`BuildResult::Timeout`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
    /// No completed build inside the staleness window. Never sent by the server.
    Timeout,
    Other(Box<str>),
}

impl BuildResult {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
            Self::Timeout => "TIMEOUT",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for BuildResult {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SUCCESS" => Self::Success,
            "UNSTABLE" => Self::Unstable,
            "FAILURE" => Self::Failure,
            "NOT_BUILT" => Self::NotBuilt,
            "ABORTED" => Self::Aborted,
            "TIMEOUT" => Self::Timeout,
            _ => Self::Other(value.into_boxed_str()),
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status fields of a build, as returned by
/// `.../api/json?tree=timestamp,result,number,duration,url`.
///
/// `result == None` means the build is still running. Once `result` is set the
/// outcome is terminal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BuildOutcome {
    pub number: Option<u64>,
    pub result: Option<BuildResult>,
    /// Build duration in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: Option<u64>,
    /// Build start in epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: Option<i64>,
    pub url: Option<String>,
}

impl BuildOutcome {
    /// Sentinel for "the last completed build is too old to be this execution".
    #[must_use]
    pub fn timed_out() -> Self {
        Self {
            result: Some(BuildResult::Timeout),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == Some(BuildResult::Success)
    }

    /// Duration of a finished build. Running builds report `None`.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        if !self.is_terminal() {
            return None;
        }
        self.duration_ms.map(Duration::from_millis)
    }

    /// Replace the outcome by [`BuildOutcome::timed_out`] when its start lies more than
    /// `window` before `now`. A missing timestamp counts as the epoch.
    #[must_use]
    pub fn within_window(self, window: Duration, now: SystemTime) -> Self {
        let started =
            UNIX_EPOCH + Duration::from_millis(self.timestamp_ms.unwrap_or(0).max(0) as u64);
        let age = now.duration_since(started).unwrap_or(Duration::ZERO);
        if age > window {
            Self::timed_out()
        } else {
            self
        }
    }
}

/// Build parameters, keyed by parameter name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildParameters(BTreeMap<String, String>);

impl BuildParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return the `TASKID` value, generating and storing one if the caller did not supply it.
    pub fn ensure_correlation_id(&mut self) -> CorrelationId {
        let value = self
            .0
            .entry(CORRELATION_PARAMETER.to_owned())
            .or_insert_with(|| CorrelationId::generate().as_str().to_owned());
        CorrelationId::new(value.as_str())
    }
}

/// Parses `key=value,key2=value2`. Values may contain `=`.
impl FromStr for BuildParameters {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut params = Self::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                Error::invalid_config(format!("job argument `{entry}` is not key=value"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::invalid_config(format!(
                    "job argument `{entry}` has an empty name"
                )));
            }
            params.insert(key, value);
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A job endpoint plus the parameters used to start it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobReference {
    url: Url,
    parameters: BuildParameters,
}

impl JobReference {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        Ok(Self {
            url: normalize_base_url(raw)?,
            parameters: BuildParameters::new(),
        })
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: BuildParameters) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn parameters(&self) -> &BuildParameters {
        &self.parameters
    }

    /// `scheme://host[:port]/` of the job, where the crumb issuer lives.
    pub fn origin(&self) -> Result<Url, Error> {
        origin_url(&self.url)
    }
}

impl FromStr for JobReference {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for JobReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Result of triggering a build.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct TriggeredBuild {
    /// `TASKID` value submitted with the build.
    pub correlation_id: CorrelationId,
    /// URL of the job's `lastBuild` right after the submission.
    pub build_url: BuildUrl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_decodes_running_and_finished_builds() {
        let running: BuildOutcome = serde_json::from_value(json!({
            "_class": "hudson.model.FreeStyleBuild",
            "number": 7,
            "result": null,
            "duration": 0,
            "timestamp": 1_700_000_000_000i64,
            "url": "https://ci.example.com/job/deploy/7/"
        }))
        .unwrap();
        assert!(!running.is_terminal());
        assert_eq!(running.duration(), None);

        let done: BuildOutcome = serde_json::from_value(json!({
            "number": 7,
            "result": "UNSTABLE",
            "duration": 1500
        }))
        .unwrap();
        assert_eq!(done.result, Some(BuildResult::Unstable));
        assert_eq!(done.duration(), Some(Duration::from_millis(1500)));
        assert!(!done.is_success());
    }

    #[test]
    fn unknown_results_are_kept_verbatim() {
        let outcome: BuildOutcome =
            serde_json::from_value(json!({ "result": "CYCLE_DETECTED" })).unwrap();
        assert_eq!(outcome.result.unwrap().as_str(), "CYCLE_DETECTED");
    }

    #[test]
    fn stale_outcome_becomes_timeout() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let outcome = BuildOutcome {
            number: Some(3),
            result: Some(BuildResult::Success),
            duration_ms: Some(10),
            timestamp_ms: Some(1_700_000_000_000 - 100_000),
            url: None,
        };

        assert_eq!(
            outcome.clone().within_window(Duration::from_secs(50), now),
            BuildOutcome::timed_out()
        );
        assert_eq!(
            outcome.clone().within_window(Duration::from_secs(200), now),
            outcome
        );
    }

    #[test]
    fn missing_timestamp_is_stale() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let outcome = BuildOutcome {
            result: Some(BuildResult::Success),
            ..BuildOutcome::default()
        };
        assert_eq!(
            outcome.within_window(Duration::from_secs(900), now).result,
            Some(BuildResult::Timeout)
        );
    }

    #[test]
    fn parameters_parse_csv() {
        let params: BuildParameters = "env=prod, version=1.2=rc,flag=".parse().unwrap();
        assert_eq!(params.get("env"), Some("prod"));
        assert_eq!(params.get("version"), Some("1.2=rc"));
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.len(), 3);

        assert!("".parse::<BuildParameters>().unwrap().is_empty());
        assert!("novalue".parse::<BuildParameters>().is_err());
        assert!("=x".parse::<BuildParameters>().is_err());
    }

    #[test]
    fn correlation_id_is_injected_once() {
        let mut params: BuildParameters = [("env", "prod")].into_iter().collect();
        let id = params.ensure_correlation_id();
        assert_eq!(params.get(CORRELATION_PARAMETER), Some(id.as_str()));
        assert_eq!(params.len(), 2);

        let again = params.ensure_correlation_id();
        assert_eq!(again, id);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn caller_supplied_correlation_id_is_kept() {
        let mut params: BuildParameters = [(CORRELATION_PARAMETER, "mine")].into_iter().collect();
        assert_eq!(params.ensure_correlation_id().as_str(), "mine");
    }

    #[test]
    fn job_reference_resolves_origin() {
        let job = JobReference::parse("https://ci.example.com/jenkins/job/deploy").unwrap();
        assert_eq!(job.url().as_str(), "https://ci.example.com/jenkins/job/deploy/");
        assert_eq!(job.origin().unwrap().as_str(), "https://ci.example.com/");
    }
}
