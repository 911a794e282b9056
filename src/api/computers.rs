use crate::transport::request::Request;
use crate::{ComputerSet, Error};

/// Fields needed to report node health.
pub const COMPUTER_TREE: &str = "computer[displayName,offline,idle,offlineCauseReason]";

/// Jenkins computers/nodes APIs.
#[derive(Clone)]
pub struct ComputersService {
    client: crate::BlockingClient,
}

impl ComputersService {
    pub(crate) fn new(client: crate::BlockingClient) -> Self {
        Self { client }
    }

    /// `GET /computer/api/json`
    pub fn list(&self) -> Result<ComputerSet, Error> {
        self.client.send_json(
            Request::get(&["computer", "api", "json"]).tree(COMPUTER_TREE),
        )
    }
}
