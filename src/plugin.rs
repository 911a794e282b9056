//! Monitoring-plugin output: a status headline, free text sections, optional
//! performance data, and the matching process exit code.
//!
//! ```text
//! WARNING
//!
//! Queue length: 7 jobs
//!
//! |queue_length=7;5;10;;
//! ```

use std::fmt;

#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning/critical levels. A value at or above a level triggers it; missing levels never trigger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Thresholds {
    pub warning: Option<u64>,
    pub critical: Option<u64>,
}

impl Thresholds {
    #[must_use]
    pub fn new(warning: Option<u64>, critical: Option<u64>) -> Self {
        Self { warning, critical }
    }

    pub fn evaluate(&self, value: u64) -> ServiceState {
        if self.critical.is_some_and(|crit| value >= crit) {
            ServiceState::Critical
        } else if self.warning.is_some_and(|warn| value >= warn) {
            ServiceState::Warning
        } else {
            ServiceState::Ok
        }
    }
}

fn level(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One `label=value;warn;crit;min;max` token. Empty fields stay empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PerfDatum {
    label: String,
    value: String,
    warn: String,
    crit: String,
    min: String,
    max: String,
}

impl PerfDatum {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            ..Self::default()
        }
    }

    /// Datum whose value is unknown; the key is still emitted.
    #[must_use]
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.warn = level(thresholds.warning);
        self.crit = level(thresholds.critical);
        self
    }

    #[must_use]
    pub fn max(mut self, max: impl fmt::Display) -> Self {
        self.max = max.to_string();
        self
    }
}

impl fmt::Display for PerfDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={};{};{};{};{}",
            self.label, self.value, self.warn, self.crit, self.min, self.max
        )
    }
}

/// Everything a check prints, plus its exit code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    headline: String,
    state: ServiceState,
    sections: Vec<Vec<String>>,
    perf_data: Vec<PerfDatum>,
    show_perf_data: bool,
}

impl Report {
    /// Report whose headline is the state name itself.
    pub fn new(state: ServiceState) -> Self {
        Self::with_headline(state.as_str(), state)
    }

    pub fn with_headline(headline: impl Into<String>, state: ServiceState) -> Self {
        Self {
            headline: headline.into(),
            state,
            sections: Vec::new(),
            perf_data: Vec::new(),
            show_perf_data: false,
        }
    }

    /// `UNKNOWN` report for a check that could not gather its data.
    pub fn unknown(error: &crate::Error) -> Self {
        Self::new(ServiceState::Unknown).section([error.to_string()])
    }

    pub fn section<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections.push(lines.into_iter().map(Into::into).collect());
        self
    }

    pub fn perf(mut self, datum: PerfDatum) -> Self {
        self.perf_data.push(datum);
        self
    }

    pub fn show_perf_data(mut self, yes: bool) -> Self {
        self.show_perf_data = yes;
        self
    }

    #[must_use]
    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }

    #[must_use]
    pub fn perf_data(&self) -> &[PerfDatum] {
        &self.perf_data
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.headline)?;
        for section in self.sections.iter().filter(|s| !s.is_empty()) {
            write!(f, "\n\n{}", section.join("\n"))?;
        }
        if self.show_perf_data && !self.perf_data.is_empty() {
            f.write_str("\n\n|")?;
            for (i, datum) in self.perf_data.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{datum}")?;
            }
        }
        Ok(())
    }
}
