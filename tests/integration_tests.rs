//! Integration tests for jobpilot

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use jobpilot::apply::{ApplicationDispatcher, ApplicationReceipt, DryRunDispatcher, JobSummary};
use jobpilot::jobs::{JobRecord, JobSource, JsonFileSource};
use jobpilot::llm::prompts::JOB_SEPARATOR;
use jobpilot::llm::{Classifier, ClassifierSettings, ModelClient, ModelRequest, ModelResponse};
use jobpilot::pipeline::{Pipeline, RunOptions, NO_JOBS_MESSAGE, NO_MATCHES_MESSAGE};
use jobpilot::server::{router, CronState};
use jobpilot::{JobPilotError, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;

/// Says yes to every job whose title mentions Rust.
struct KeywordModel {
    calls: AtomicUsize,
}

impl KeywordModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelClient for KeywordModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let jobs_section = request.prompt.split("Jobs:\n").nth(1).unwrap_or_default();
        let verdicts: Vec<Value> = jobs_section
            .split(JOB_SEPARATOR)
            .enumerate()
            .map(|(idx, block)| {
                let title_line = block.lines().find(|l| l.starts_with("Title: ")).unwrap_or_default();
                json!({
                    "jobIndex": idx,
                    "matchesPreferences": title_line.contains("Rust"),
                    "reasoning": format!("checked {}", title_line),
                })
            })
            .collect();
        Ok(ModelResponse::new(format!("```json\n{}\n```", Value::Array(verdicts))))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

struct StaticSource(Vec<JobRecord>);

#[async_trait]
impl JobSource for StaticSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Blocks until released, so a second trigger can overlap it.
struct GatedSource {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl JobSource for GatedSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

struct FailingSource;

#[async_trait]
impl JobSource for FailingSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        Err(JobPilotError::Scrape("scrape service unreachable".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    received: Mutex<Vec<(Vec<String>, bool)>>,
}

#[async_trait]
impl ApplicationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, jobs: &[JobRecord], wait: bool) -> Result<ApplicationReceipt> {
        let ids = jobs.iter().map(|j| j.id.clone()).collect();
        self.received.lock().unwrap().push((ids, wait));
        Ok(ApplicationReceipt {
            task_id: Some("task-1".to_string()),
            session_id: Some("session-1".to_string()),
            job_count: jobs.len(),
            jobs: jobs.iter().filter_map(JobSummary::from_job).collect(),
            status: Some("finished".to_string()),
            ..ApplicationReceipt::default()
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn fast_settings(batch_size: usize) -> ClassifierSettings {
    ClassifierSettings {
        batch_size,
        inter_batch_delay: Duration::ZERO,
        min_batch_delay: Duration::ZERO,
        ..ClassifierSettings::default()
    }
}

fn job(id: &str, title: &str) -> JobRecord {
    JobRecord::new(id)
        .with_title(title)
        .with_company("Acme")
        .with_job_url(format!("https://jobs.example/{}", id))
}

fn pipeline_with(source: Arc<dyn JobSource>, model: Arc<KeywordModel>, dispatcher: Arc<dyn ApplicationDispatcher>) -> Pipeline {
    let classifier = Classifier::new(model, fast_settings(2));
    Pipeline::new(source, classifier, dispatcher, "Remote Rust roles only").unwrap()
}

#[tokio::test]
async fn test_fixture_is_sanitized_and_deduplicated() {
    let jobs = JsonFileSource::new("tests/fixtures/jobs.json").fetch_jobs().await.unwrap();

    let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["in-101", "102", "in-103"]);

    let first = &jobs[0];
    assert_eq!(first.title.as_deref(), Some("Senior Rust Engineer (updated)"));
    assert_eq!(first.job_url.as_deref(), Some("https://ph.indeed.com/viewjob?jk=101"));
    assert!(!first.extra.contains_key("jobLevel"));
    assert!(!jobs[1].extra.contains_key("companyRevenue"));
    for job in &jobs {
        assert!(!job.extra.contains_key("companyLogo"));
        assert!(!job.extra.contains_key("skills"));
        assert!(!job.extra.contains_key("emails"));
    }
}

#[tokio::test]
async fn test_missing_jobs_file_is_invalid_input() {
    let result = JsonFileSource::new("tests/fixtures/nope.json").fetch_jobs().await;
    assert!(matches!(result, Err(JobPilotError::InvalidInput(_))));
}

#[tokio::test]
async fn test_full_pass_applies_to_matches_only() {
    let jobs = JsonFileSource::new("tests/fixtures/jobs.json").fetch_jobs().await.unwrap();
    let model = KeywordModel::new();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let pipeline = pipeline_with(Arc::new(StaticSource(jobs)), model.clone(), dispatcher.clone());

    let report = pipeline.run(RunOptions { wait: false }).await.unwrap();

    assert!(report.success);
    assert_eq!(report.jobs_scraped, 3);
    assert_eq!(report.jobs_matched, 2);
    assert_eq!(report.jobs_applied, 2);
    assert_eq!(report.batches.len(), 2);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);

    let matched: Vec<&str> = report.matches.iter().map(|m| m.job.id.as_str()).collect();
    assert_eq!(matched, vec!["in-101", "in-103"]);
    assert!(report.matches[0].reasoning().contains("Senior Rust Engineer"));

    let received = dispatcher.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, vec!["in-101".to_string(), "in-103".to_string()]);
    assert!(!received[0].1);
    assert_eq!(report.receipt.as_ref().and_then(|r| r.task_id.as_deref()), Some("task-1"));
}

#[tokio::test]
async fn test_no_jobs_short_circuits_before_the_model() {
    let model = KeywordModel::new();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let pipeline = pipeline_with(Arc::new(StaticSource(Vec::new())), model.clone(), dispatcher.clone());

    let report = pipeline.run(RunOptions::default()).await.unwrap();

    assert!(report.success);
    assert_eq!(report.message, NO_JOBS_MESSAGE);
    assert_eq!(report.jobs_scraped, 0);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert!(dispatcher.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_matches_skips_dispatch() {
    let jobs = vec![job("1", "Office Manager"), job("2", "Barista")];
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let pipeline = pipeline_with(Arc::new(StaticSource(jobs)), KeywordModel::new(), dispatcher.clone());

    let report = pipeline.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.message, NO_MATCHES_MESSAGE);
    assert_eq!(report.jobs_scraped, 2);
    assert_eq!(report.jobs_matched, 0);
    assert!(report.receipt.is_none());
    assert!(dispatcher.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_applied_count_excludes_matches_without_a_url() {
    let jobs = vec![
        job("1", "Rust Developer"),
        JobRecord::new("2").with_title("Rust Consultant").with_company("No Link Ltd"),
        job("3", "Barista"),
    ];
    let pipeline = pipeline_with(Arc::new(StaticSource(jobs)), KeywordModel::new(), Arc::new(DryRunDispatcher));

    let report = pipeline.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.jobs_matched, 2);
    assert_eq!(report.jobs_applied, 1);
    let receipt = report.receipt.unwrap();
    assert_eq!(receipt.jobs.len(), 1);
    assert_eq!(receipt.jobs[0].url, "https://jobs.example/1");
}

#[tokio::test]
async fn test_blank_preferences_are_rejected_up_front() {
    let classifier = Classifier::new(KeywordModel::new(), fast_settings(2));
    let result = Pipeline::new(
        Arc::new(StaticSource(Vec::new())),
        classifier,
        Arc::new(DryRunDispatcher),
        "   ",
    );
    assert!(matches!(result, Err(JobPilotError::Configuration(_))));
}

fn cron_request(auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/cron");
    if let Some(value) = auth {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_cron_rejects_wrong_secret() {
    let pipeline = pipeline_with(
        Arc::new(StaticSource(Vec::new())),
        KeywordModel::new(),
        Arc::new(DryRunDispatcher),
    );
    let app = router(CronState::new(pipeline, Some("s3cret".to_string())));

    let missing = app.clone().oneshot(cron_request(None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(missing).await, json!({ "error": "Unauthorized" }));

    let wrong = app.oneshot(cron_request(Some("Bearer nope"))).await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cron_runs_a_pass_with_the_right_secret() {
    let jobs = vec![job("1", "Rust Developer"), job("2", "Barista")];
    let pipeline = pipeline_with(
        Arc::new(StaticSource(jobs)),
        KeywordModel::new(),
        Arc::new(RecordingDispatcher::default()),
    );
    let app = router(CronState::new(pipeline, Some("s3cret".to_string())));

    let response = app.oneshot(cron_request(Some("Bearer s3cret"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["jobsScraped"], 2);
    assert_eq!(body["jobsMatched"], 1);
    assert_eq!(body["jobsApplied"], 1);
    assert_eq!(body["results"]["taskId"], "task-1");
    assert_eq!(body["results"]["jobs"][0]["url"], "https://jobs.example/1");
}

#[tokio::test]
async fn test_cron_without_secret_is_open_and_reports_empty_runs() {
    let pipeline = pipeline_with(
        Arc::new(StaticSource(Vec::new())),
        KeywordModel::new(),
        Arc::new(DryRunDispatcher),
    );
    let app = router(CronState::new(pipeline, None));

    let response = app.oneshot(cron_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], NO_JOBS_MESSAGE);
    assert_eq!(body["jobsApplied"], 0);
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn test_cron_failure_is_a_500_with_message() {
    let pipeline = pipeline_with(Arc::new(FailingSource), KeywordModel::new(), Arc::new(DryRunDispatcher));
    let app = router(CronState::new(pipeline, None));

    let response = app.oneshot(cron_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
    assert!(body["message"].as_str().unwrap().contains("scrape service unreachable"));
}

#[tokio::test]
async fn test_overlapping_trigger_gets_conflict() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let source = GatedSource {
        started: started.clone(),
        release: release.clone(),
    };
    let pipeline = pipeline_with(Arc::new(source), KeywordModel::new(), Arc::new(DryRunDispatcher));
    let app = router(CronState::new(pipeline, None));

    let first = tokio::spawn(app.clone().oneshot(cron_request(None)));
    started.notified().await;

    let second = app.oneshot(cron_request(None)).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let pipeline = pipeline_with(
        Arc::new(StaticSource(Vec::new())),
        KeywordModel::new(),
        Arc::new(DryRunDispatcher),
    );
    let app = router(CronState::new(pipeline, None));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
