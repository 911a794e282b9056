//! `check-jenkins`: monitoring plugin for Jenkins.
//!
//! ```bash
//! check-jenkins node-status --host https://ci.example.com -w 1 -c 3
//! check-jenkins queue-length --host https://ci.example.com -w 10 -c 25
//! check-jenkins -u bot -p "$TOKEN" --enable-performance-data \
//!     run-job --jenkins-job https://ci.example.com/job/smoke --job-arguments env=prod
//! ```
//!
//! The report goes to stdout and the exit code follows the plugin convention
//! (0 OK, 1 WARNING, 2 CRITICAL/FAIL, 3 UNKNOWN). Logs go to stderr.

use clap::Parser;
use jenkins_check::plugin::{Report, ServiceState};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = match cli::Cli::try_parse() {
        Ok(args) => args,
        Err(err) if !err.use_stderr() => {
            // --help / --version
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let report =
                Report::new(ServiceState::Unknown).section([err.render().to_string()]);
            return emit(&report);
        }
    };

    init_tracing(args.verbose);
    emit(&args.run())
}

fn emit(report: &Report) -> ExitCode {
    println!("{report}");
    ExitCode::from(report.exit_code() as u8)
}
