use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use http::{HeaderName, HeaderValue};
use jenkins_check::{
    BlockingClient, BuildParameters, BuildResult, CancelToken, Error, JobReference, Pacer,
    api::LAST_COMPLETED_TREE,
    checks::{
        node_status, queue_length,
        run_job::{self, Resolution},
    },
    plugin::{ServiceState, Thresholds},
};
use serde_json::json;
use tokio::task;
use wiremock::{
    Match, Mock, MockServer, Request, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

#[derive(Clone, Copy)]
struct CrumbHeader(&'static str);

impl Match for CrumbHeader {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("Jenkins-Crumb")
            .and_then(|value| value.to_str().ok())
            .map(|value| value == self.0)
            .unwrap_or(false)
    }
}

struct NoCrumbHeader;

impl Match for NoCrumbHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("Jenkins-Crumb")
    }
}

/// `TASKID` query parameter holding a generated 32-hex token.
struct GeneratedTaskId;

impl Match for GeneratedTaskId {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .find(|(key, _)| key == "TASKID")
            .is_some_and(|(_, value)| {
                value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit())
            })
    }
}

#[derive(Default)]
struct CountingPacer(AtomicUsize);

impl Pacer for CountingPacer {
    fn pause(&self, _interval: Duration) -> Result<(), Error> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn mock_crumb(server: &MockServer, crumb: &'static str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "crumbRequestField": "Jenkins-Crumb",
            "crumb": crumb
        })))
        .expect(expected)
        .up_to_n_times(expected)
        .mount(server)
        .await;
}

async fn mock_trigger(server: &MockServer, response: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/job/smoke/buildWithParameters"))
        .and(header("Authorization", "Basic dXNlcjp0b2tlbg=="))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

async fn mock_job(server: &MockServer, body: serde_json::Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/job/smoke/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

/// Delayed mode: `lastBuild` for the trigger, then the tree-filtered `lastCompletedBuild`.
async fn mock_delayed_lookup(server: &MockServer, last_completed: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/job/smoke/api/json"))
        .and(query_param("tree", LAST_COMPLETED_TREE))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "lastCompletedBuild": last_completed })),
        )
        .expect(1)
        .mount(server)
        .await;
    let build_url = format!("{}/job/smoke/5/", server.uri());
    mock_job(server, json!({ "lastBuild": { "url": build_url } }), 1).await;
}

fn client(server: &MockServer) -> Result<BlockingClient> {
    Ok(BlockingClient::builder(server.uri())?
        .auth_basic("user", "token")
        .timeout(Duration::from_secs(5))
        .build()?)
}

fn job(server: &MockServer) -> Result<JobReference> {
    Ok(JobReference::parse(&format!("{}/job/smoke", server.uri()))?)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trigger_sends_crumb_auth_and_parameters() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    Mock::given(method("POST"))
        .and(path("/job/smoke/buildWithParameters"))
        .and(header("Authorization", "Basic dXNlcjp0b2tlbg=="))
        .and(CrumbHeader("abc123"))
        .and(query_param("env", "prod"))
        .and(GeneratedTaskId)
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let build_url = format!("{}/job/smoke/7/", server.uri());
    mock_job(&server, json!({ "lastBuild": { "number": 7, "url": build_url } }), 1).await;

    let client = client(&server)?;
    let params: BuildParameters = "env=prod".parse()?;
    let job = job(&server)?.with_parameters(params);

    let triggered = task::spawn_blocking(move || client.jobs().trigger(&job)).await??;
    assert_eq!(triggered.build_url.as_str(), build_url);
    assert_eq!(triggered.correlation_id.as_str().len(), 32);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn caller_supplied_task_id_is_kept() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    Mock::given(method("POST"))
        .and(path("/job/smoke/buildWithParameters"))
        .and(query_param("TASKID", "mine"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mock_job(
        &server,
        json!({ "lastBuild": { "url": format!("{}/job/smoke/3/", server.uri()) } }),
        1,
    )
    .await;

    let client = client(&server)?;
    let job = job(&server)?.with_parameters("TASKID=mine".parse()?);

    let triggered = task::spawn_blocking(move || client.jobs().trigger(&job)).await??;
    assert_eq!(triggered.correlation_id.as_str(), "mine");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_crumb_issuer_still_triggers() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/job/smoke/buildWithParameters"))
        .and(NoCrumbHeader)
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mock_job(
        &server,
        json!({ "lastBuild": { "url": format!("{}/job/smoke/1/", server.uri()) } }),
        1,
    )
    .await;

    let client = client(&server)?;
    let job = job(&server)?;
    task::spawn_blocking(move || client.jobs().trigger(&job)).await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_trigger_is_failure_without_lookups() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    mock_trigger(
        &server,
        ResponseTemplate::new(500).set_body_string("boom"),
        1,
    )
    .await;
    mock_job(&server, json!({}), 0).await;

    let client = client(&server)?;
    let job = job(&server)?;
    let resolution = Resolution::Poll {
        interval: Duration::from_millis(10),
        cancel: CancelToken::new(),
    };

    let report =
        task::spawn_blocking(move || run_job::check(&client, &job, &resolution)).await?;
    assert_eq!(report.headline(), "FAILURE");
    assert_eq!(report.state(), ServiceState::Critical);
    assert_eq!(report.exit_code(), 2);
    assert!(report.to_string().contains("returned HTTP 500"));
    assert!(report.to_string().contains("\nboom"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polls_until_the_build_reports_a_result() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/smoke/7/api/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "number": 7, "result": null })),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/smoke/7/api/json"))
        .and(query_param("tree", "timestamp,result,number,duration,url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 7,
            "result": "SUCCESS",
            "duration": 4200,
            "timestamp": 1_700_000_000_000_i64,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server)?;
    let build = jenkins_check::BuildUrl::parse(&format!("{}/job/smoke/7/", server.uri()))?;
    let pacer = CountingPacer::default();

    let (outcome, pauses) = task::spawn_blocking(move || {
        let outcome = client
            .jobs()
            .wait_for_completion(&build, Duration::from_secs(10), &pacer);
        (outcome, pacer.0.load(Ordering::SeqCst))
    })
    .await?;

    let outcome = outcome?;
    assert_eq!(outcome.result, Some(BuildResult::Success));
    assert_eq!(outcome.number, Some(7));
    assert_eq!(outcome.duration(), Some(Duration::from_millis(4200)));
    assert_eq!(pauses, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_poll_ends_in_failure() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    mock_trigger(&server, ResponseTemplate::new(201), 1).await;
    mock_job(
        &server,
        json!({ "lastBuild": { "url": format!("{}/job/smoke/9/", server.uri()) } }),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/job/smoke/9/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .mount(&server)
        .await;

    let client = client(&server)?;
    let job = job(&server)?;
    let cancel = CancelToken::new();
    cancel.cancel();
    let resolution = Resolution::Poll {
        interval: Duration::from_secs(60),
        cancel,
    };

    let result =
        task::spawn_blocking(move || run_job::execute(&client, &job, &resolution)).await?;
    assert!(matches!(result, Err(Error::Cancelled)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_to_end_poll_reports_ok() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    mock_trigger(&server, ResponseTemplate::new(201), 1).await;
    mock_job(
        &server,
        json!({ "lastBuild": { "url": format!("{}/job/smoke/12/", server.uri()) } }),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/job/smoke/12/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 12,
            "result": "SUCCESS",
            "duration": 1500,
            "timestamp": now_ms(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server)?;
    let job = job(&server)?;
    let job_url = job.to_string();
    let resolution = Resolution::Poll {
        interval: Duration::from_millis(10),
        cancel: CancelToken::new(),
    };

    let report = task::spawn_blocking(move || run_job::check(&client, &job, &resolution))
        .await?
        .show_perf_data(true);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.to_string(),
        format!("OK\n\nJob {job_url} build 12 was successful\n\n|duration=1.5;;;; success=1;;;;")
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delayed_lookup_turns_stale_builds_into_timeout() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    mock_trigger(&server, ResponseTemplate::new(201), 1).await;
    mock_delayed_lookup(
        &server,
        json!({
            "number": 4,
            "result": "SUCCESS",
            "duration": 2000,
            "timestamp": now_ms() - 100_000,
        }),
    )
    .await;

    let client = client(&server)?;
    let job = job(&server)?;
    let resolution = Resolution::Delayed {
        window: Duration::from_secs(50),
    };

    let report = task::spawn_blocking(move || run_job::check(&client, &job, &resolution)).await?;
    assert_eq!(report.headline(), "FAIL");
    assert_eq!(report.exit_code(), 2);
    assert!(report.to_string().ends_with("failed on build unknown with error TIMEOUT"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delayed_lookup_keeps_fresh_builds() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    mock_trigger(&server, ResponseTemplate::new(201), 1).await;
    mock_delayed_lookup(
        &server,
        json!({
            "number": 4,
            "result": "UNSTABLE",
            "duration": 2000,
            "timestamp": now_ms() - 100_000,
        }),
    )
    .await;

    let client = client(&server)?;
    let job = job(&server)?;
    let resolution = Resolution::Delayed {
        window: Duration::from_secs(200),
    };

    let outcome =
        task::spawn_blocking(move || run_job::execute(&client, &job, &resolution)).await??;
    assert_eq!(outcome.number, Some(4));
    assert_eq!(outcome.result, Some(BuildResult::Unstable));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delayed_lookup_without_completed_builds_is_timeout() -> Result<()> {
    let server = MockServer::start().await;
    mock_crumb(&server, "abc123", 1).await;
    mock_trigger(&server, ResponseTemplate::new(201), 1).await;
    mock_delayed_lookup(&server, serde_json::Value::Null).await;

    let client = client(&server)?;
    let job = job(&server)?;
    let resolution = Resolution::Delayed {
        window: Duration::from_secs(900),
    };

    let report = task::spawn_blocking(move || run_job::check(&client, &job, &resolution)).await?;
    assert_eq!(report.headline(), "FAIL");
    assert_eq!(report.exit_code(), 2);
    assert!(report.to_string().ends_with("failed on build unknown with error TIMEOUT"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn job_without_builds_is_a_protocol_error() -> Result<()> {
    let server = MockServer::start().await;
    mock_job(&server, json!({ "lastBuild": null }), 1).await;

    let client = client(&server)?;
    let job = job(&server)?;

    let err = task::spawn_blocking(move || client.jobs().last_build_url(&job))
        .await?
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn node_status_counts_offline_nodes() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/computer/api/json"))
        .and(header("Authorization", "Basic dXNlcjp0b2tlbg=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "computer": [
                { "displayName": "master", "offline": false, "idle": false },
                {
                    "displayName": "agent-1",
                    "offline": true,
                    "idle": true,
                    "offlineCauseReason": "disk full"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server)?;
    let report = task::spawn_blocking(move || {
        node_status::check(&client, Thresholds::new(Some(1), Some(2)))
    })
    .await?
    .show_perf_data(true);

    assert_eq!(report.state(), ServiceState::Warning);
    assert_eq!(report.exit_code(), 1);
    let text = report.to_string();
    assert!(text.starts_with("WARNING\n\nNumber of nodes: 2\nOffline nodes: 1"));
    assert!(text.contains("agent-1: offline REASON: disk full"));
    assert!(text.contains("|offline_nodes=1;1;2;;2"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queue_length_reports_items() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": 1 }, { "id": 2 }, { "id": 3 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server)?;
    let report = task::spawn_blocking(move || {
        queue_length::check(&client, Thresholds::new(Some(5), Some(10)))
    })
    .await?
    .show_perf_data(true);

    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.to_string(),
        "OK\n\nQueue length: 3 jobs\n\n|queue_length=3;5;10;;"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_data_is_unknown() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue/api/json"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server)?;
    let report =
        task::spawn_blocking(move || queue_length::check(&client, Thresholds::default())).await?;
    assert_eq!(report.state(), ServiceState::Unknown);
    assert_eq!(report.exit_code(), 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_sends_configured_user_agent_and_headers() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue/api/json"))
        .and(header("user-agent", "nagios-check/2.0"))
        .and(header("x-monitor", "nagios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlockingClient::builder(server.uri())?
        .user_agent("nagios-check/2.0")
        .default_header(
            HeaderName::from_static("x-monitor"),
            HeaderValue::from_static("nagios"),
        )
        .connect_timeout(Duration::from_secs(1))
        .no_system_proxy()
        .build()?;
    let queue = task::spawn_blocking(move || client.queue().list()).await??;
    assert!(queue.items.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn anonymous_client_sends_no_credentials() -> Result<()> {
    struct NoAuthorization;

    impl Match for NoAuthorization {
        fn matches(&self, request: &Request) -> bool {
            !request.headers.contains_key("Authorization")
        }
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue/api/json"))
        .and(NoAuthorization)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": 9 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlockingClient::new(server.uri())?;
    let report =
        task::spawn_blocking(move || queue_length::check(&client, Thresholds::default())).await?;
    assert_eq!(report.exit_code(), 0);
    assert!(report.to_string().contains("Queue length: 1 jobs"));
    Ok(())
}
