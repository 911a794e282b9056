use serde::Deserialize;

/// JSON payload of `GET /crumbIssuer/api/json`.
#[derive(Clone, Debug, Deserialize)]
#[non_exhaustive]
pub struct Crumb {
    #[serde(rename = "crumbRequestField")]
    pub crumb_request_field: String,
    pub crumb: String,
}

/// Node list from `GET /computer/api/json`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ComputerSet {
    #[serde(rename = "computer", default)]
    pub computers: Vec<Computer>,
}

impl ComputerSet {
    #[must_use]
    pub fn offline_count(&self) -> usize {
        self.computers.iter().filter(|c| c.offline).count()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Computer {
    pub display_name: String,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub idle: bool,
    #[serde(default)]
    pub offline_cause_reason: Option<String>,
}

/// Build queue from `GET /queue/api/json`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub items: Vec<QueueItem>,
}

impl QueueSnapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct QueueItem {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub why: Option<String>,
}
