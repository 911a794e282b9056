//! The checks behind each `check-jenkins` mode. Each one turns server state (or the
//! failure to read it) into a [`Report`](crate::plugin::Report).

pub mod node_status;
pub mod queue_length;
pub mod run_job;
