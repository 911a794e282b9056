use crate::{
    BlockingClient, ComputerSet,
    plugin::{PerfDatum, Report, Thresholds},
};

/// Alert on the number of offline nodes.
pub fn check(client: &BlockingClient, thresholds: Thresholds) -> Report {
    match client.computers().list() {
        Ok(nodes) => evaluate(&nodes, thresholds),
        Err(err) => {
            tracing::warn!(error = %err, "could not list nodes");
            Report::unknown(&err)
        }
    }
}

pub fn evaluate(nodes: &ComputerSet, thresholds: Thresholds) -> Report {
    let total = nodes.computers.len();
    let offline = nodes.offline_count();

    let details = nodes.computers.iter().map(|node| {
        if node.offline {
            format!(
                "{}: offline REASON: {}",
                node.display_name,
                node.offline_cause_reason.as_deref().unwrap_or_default()
            )
        } else {
            format!("{}: online", node.display_name)
        }
    });

    let mut report = Report::new(thresholds.evaluate(offline as u64))
        .section([
            format!("Number of nodes: {total}"),
            format!("Offline nodes: {offline}"),
        ])
        .section(details)
        .perf(
            PerfDatum::new("offline_nodes", offline)
                .thresholds(thresholds)
                .max(total),
        );

    for node in &nodes.computers {
        report = report
            .perf(PerfDatum::new(
                format!("{}.online", node.display_name),
                u8::from(!node.offline),
            ))
            .perf(PerfDatum::new(
                format!("{}.running", node.display_name),
                u8::from(!node.idle),
            ));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::ServiceState;
    use serde_json::json;

    fn nodes() -> ComputerSet {
        serde_json::from_value(json!({
            "computer": [
                { "displayName": "master", "offline": false, "idle": false },
                {
                    "displayName": "agent-1",
                    "offline": true,
                    "idle": true,
                    "offlineCauseReason": "disk full"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn offline_node_triggers_warning() {
        let report = evaluate(&nodes(), Thresholds::new(Some(1), Some(2)));
        assert_eq!(report.state(), ServiceState::Warning);
        assert_eq!(
            report.show_perf_data(true).to_string(),
            "WARNING\n\n\
             Number of nodes: 2\nOffline nodes: 1\n\n\
             master: online\nagent-1: offline REASON: disk full\n\n\
             |offline_nodes=1;1;2;;2 master.online=1;;;; master.running=1;;;; \
             agent-1.online=0;;;; agent-1.running=0;;;;"
        );
    }

    #[test]
    fn no_thresholds_is_ok() {
        let report = evaluate(&nodes(), Thresholds::default());
        assert_eq!(report.state(), ServiceState::Ok);
        assert_eq!(report.exit_code(), 0);
    }
}
