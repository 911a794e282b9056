use clap::{ArgAction, Args, Parser, Subcommand};
use jenkins_check::{
    Auth, BlockingClient, BuildParameters, CancelToken, Error, JobReference,
    checks::{
        node_status, queue_length,
        run_job::{self, Resolution},
    },
    plugin::{Report, Thresholds},
    poll::DEFAULT_POLL_INTERVAL,
};
use std::time::Duration;

/// Check a Jenkins server and report in monitoring-plugin format.
#[derive(Debug, Parser)]
#[command(name = "check-jenkins", version, about)]
pub(crate) struct Cli {
    /// Jenkins user name.
    #[arg(short, long, env = "JENKINS_USER", global = true)]
    username: Option<String>,

    /// Jenkins password or API token.
    #[arg(short, long, env = "JENKINS_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Accept invalid TLS certificates.
    #[arg(long, visible_alias = "ignore-ssl", global = true)]
    insecure: bool,

    /// Append performance data to the report.
    #[arg(long, global = true)]
    enable_performance_data: bool,

    /// Per-request network timeout.
    #[arg(long, value_name = "SECONDS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Log to stderr; repeat for more detail. `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Alert on offline nodes
    NodeStatus(ThresholdArgs),
    /// Alert on the build queue length
    #[command(alias = "queue-lenght")]
    QueueLength(ThresholdArgs),
    /// Trigger a job and report its result
    RunJob(RunJobArgs),
}

#[derive(Debug, Args)]
struct ThresholdArgs {
    /// Jenkins base URL.
    #[arg(long, env = "JENKINS_URL")]
    host: String,

    /// Value at which to report WARNING.
    #[arg(short, long)]
    warning: Option<u64>,

    /// Value at which to report CRITICAL.
    #[arg(short, long)]
    critical: Option<u64>,
}

impl ThresholdArgs {
    fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.warning, self.critical)
    }
}

#[derive(Debug, Args)]
struct RunJobArgs {
    /// Job URL, e.g. https://ci.example.com/job/smoke-test
    #[arg(long)]
    jenkins_job: JobReference,

    /// Build parameters as `key=value` CSV.
    #[arg(long, default_value = "")]
    job_arguments: BuildParameters,

    /// Do not wait for the triggered build; report the last completed build instead.
    #[arg(short, long)]
    delayed: bool,

    /// In delayed mode, how old the last completed build may be.
    #[arg(long, value_name = "SECONDS", default_value_t = 900)]
    timeout: u64,

    /// Seconds between status polls of the triggered build.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    poll_interval: u64,

    /// Give up polling after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    poll_timeout: Option<u64>,
}

impl RunJobArgs {
    fn resolution(&self) -> Resolution {
        if self.delayed {
            return Resolution::Delayed {
                window: Duration::from_secs(self.timeout),
            };
        }
        let cancel = match self.poll_timeout {
            Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
            None => CancelToken::new(),
        };
        Resolution::Poll {
            interval: Duration::from_secs(self.poll_interval),
            cancel,
        }
    }
}

impl Cli {
    fn client(&self, base: &str) -> Result<BlockingClient, Error> {
        BlockingClient::builder(base)?
            .maybe_auth(Auth::from_parts(
                self.username.clone(),
                self.password.clone(),
            ))
            .danger_accept_invalid_certs(self.insecure)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
    }

    pub(crate) fn run(&self) -> Report {
        let report = match &self.command {
            Command::NodeStatus(args) => match self.client(&args.host) {
                Ok(client) => node_status::check(&client, args.thresholds()),
                Err(err) => Report::unknown(&err),
            },
            Command::QueueLength(args) => match self.client(&args.host) {
                Ok(client) => queue_length::check(&client, args.thresholds()),
                Err(err) => Report::unknown(&err),
            },
            Command::RunJob(args) => {
                let job = args.jenkins_job.clone().with_parameters(args.job_arguments.clone());
                let client = job
                    .origin()
                    .and_then(|origin| self.client(origin.as_str()));
                match client {
                    Ok(client) => run_job::check(&client, &job, &args.resolution()),
                    Err(err) => run_job::report(&job, &Err(err)),
                }
            }
        };
        report.show_perf_data(self.enable_performance_data)
    }
}
