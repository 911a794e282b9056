use crate::transport::request::Request;
use crate::{Error, QueueSnapshot};

/// Fields needed to count and describe queued items.
pub const QUEUE_TREE: &str = "items[id,why]";

/// Jenkins build queue APIs.
#[derive(Clone)]
pub struct QueueService {
    client: crate::BlockingClient,
}

impl QueueService {
    pub(crate) fn new(client: crate::BlockingClient) -> Self {
        Self { client }
    }

    /// `GET /queue/api/json?tree=items[id,why]`
    pub fn list(&self) -> Result<QueueSnapshot, Error> {
        let req = Request::get(&["queue", "api", "json"]).tree(QUEUE_TREE);
        self.client.send_json(req)
    }
}
