use crate::{
    BlockingClient, QueueSnapshot,
    plugin::{PerfDatum, Report, Thresholds},
};

/// Alert on the number of items waiting in the build queue.
pub fn check(client: &BlockingClient, thresholds: Thresholds) -> Report {
    match client.queue().list() {
        Ok(queue) => evaluate(&queue, thresholds),
        Err(err) => {
            tracing::warn!(error = %err, "could not read the build queue");
            Report::unknown(&err)
        }
    }
}

pub fn evaluate(queue: &QueueSnapshot, thresholds: Thresholds) -> Report {
    let length = queue.len();
    Report::new(thresholds.evaluate(length as u64))
        .section([format!("Queue length: {length} jobs")])
        .perf(PerfDatum::new("queue_length", length).thresholds(thresholds))
}
