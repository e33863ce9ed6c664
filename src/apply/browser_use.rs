//! Browser Use cloud client: one session, one task covering every matched job

use crate::apply::dispatcher::{applicable_jobs, ApplicationDispatcher, ApplicationReceipt, JobSummary};
use crate::apply::task::ApplicationTask;
use crate::config::{required_env, ApplyConfig};
use crate::error::{JobPilotError, Result};
use crate::jobs::JobRecord;
use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

const VIEW_URL_BASE: &str = "https://cloud.browser-use.com/thread";

pub struct BrowserUseDispatcher {
    client: reqwest::Client,
    api_base: String,
    profile_id: String,
    config: ApplyConfig,
    show_progress: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSession<'a> {
    profile_id: &'a str,
    proxy_country_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    id: String,
    live_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTask<'a> {
    task: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreated {
    id: String,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskView {
    status: String,
    output: Option<String>,
}

#[derive(Serialize)]
struct SessionAction<'a> {
    action: &'a str,
}

/// Statuses after which a task will not change again.
pub fn is_terminal_status(status: &str) -> bool {
    matches!(
        status.to_ascii_lowercase().as_str(),
        "finished" | "stopped" | "failed" | "completed" | "error"
    )
}

impl BrowserUseDispatcher {
    /// Needs the API key and browser profile id from the environment.
    pub fn from_config(config: &ApplyConfig) -> Result<Self> {
        let api_key = required_env(&config.api_key_env)?;
        let profile_id = required_env(&config.profile_id_env)?;
        Self::new(&api_key, profile_id, config.clone())
    }

    pub fn new(api_key: &str, profile_id: String, config: ApplyConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Browser-Use-API-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| JobPilotError::Configuration("invalid Browser Use API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            profile_id,
            config,
            show_progress: true,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    async fn create_session(&self) -> anyhow::Result<SessionView> {
        let body = CreateSession {
            profile_id: &self.profile_id,
            proxy_country_code: &self.config.proxy_country_code,
        };
        let resp = self
            .client
            .post(self.url("sessions"))
            .json(&body)
            .send()
            .await
            .context("failed to create browser session")?;
        Self::json_or_bail(resp, "create session").await
    }

    async fn create_task(&self, task: &str, session_id: &str) -> anyhow::Result<TaskCreated> {
        let resp = self
            .client
            .post(self.url("tasks"))
            .json(&CreateTask { task, session_id })
            .send()
            .await
            .context("failed to create browser task")?;
        Self::json_or_bail(resp, "create task").await
    }

    async fn task_status(&self, task_id: &str) -> anyhow::Result<TaskView> {
        let resp = self
            .client
            .get(self.url(&format!("tasks/{}", task_id)))
            .send()
            .await
            .context("failed to fetch task status")?;
        Self::json_or_bail(resp, "get task").await
    }

    async fn stop_session(&self, session_id: &str) -> anyhow::Result<()> {
        info!("Stopping session {}...", session_id);
        let resp = self
            .client
            .patch(self.url(&format!("sessions/{}", session_id)))
            .json(&SessionAction { action: "stop" })
            .send()
            .await
            .context("failed to stop browser session")?;
        if !resp.status().is_success() {
            anyhow::bail!("stop session returned {}", resp.status());
        }
        Ok(())
    }

    async fn json_or_bail<T: serde::de::DeserializeOwned>(resp: reqwest::Response, what: &str) -> anyhow::Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("{} returned {}: {}", what, status, body);
        }
        resp.json::<T>().await.with_context(|| format!("failed to parse {} response", what))
    }

    /// Poll until the task reaches a terminal status or the wait budget runs out.
    async fn wait_for_task(&self, task_id: &str) -> anyhow::Result<TaskView> {
        let spinner = if self.show_progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));

        let deadline = Instant::now() + Duration::from_secs(self.config.max_wait_secs);
        let poll = Duration::from_secs(self.config.poll_interval_secs.max(1));
        let result = loop {
            let view = self.task_status(task_id).await?;
            spinner.set_message(format!("Task {} is {}", task_id, view.status));
            if is_terminal_status(&view.status) {
                break Ok(view);
            }
            if Instant::now() >= deadline {
                break Err(anyhow::anyhow!(
                    "task {} still {} after {}s",
                    task_id,
                    view.status,
                    self.config.max_wait_secs
                ));
            }
            tokio::time::sleep(poll).await;
        };
        spinner.finish_and_clear();
        result
    }
}

#[async_trait]
impl ApplicationDispatcher for BrowserUseDispatcher {
    async fn dispatch(&self, jobs: &[JobRecord], wait: bool) -> Result<ApplicationReceipt> {
        let jobs = applicable_jobs(jobs);
        if jobs.is_empty() {
            return Err(JobPilotError::Dispatch("none of the jobs has a job URL".to_string()));
        }
        info!("Starting application process for {} job(s)", jobs.len());

        let session = self
            .create_session()
            .await
            .map_err(|e| JobPilotError::Dispatch(format!("{:#}", e)))?;
        info!("Session created: {}", session.id);
        if let Some(live) = &session.live_url {
            info!("Live URL: {}", live);
        }

        let task_text = ApplicationTask {
            jobs: &jobs,
            applicant_facts: &self.config.applicant_facts,
            availability_window: &self.config.availability_window,
            today: chrono::Local::now().date_naive(),
        }
        .render();

        let task = match self.create_task(&task_text, &session.id).await {
            Ok(task) => task,
            Err(e) => {
                if let Err(stop_err) = self.stop_session(&session.id).await {
                    warn!("Could not stop session {}: {:#}", session.id, stop_err);
                }
                return Err(JobPilotError::Dispatch(format!("{:#}", e)));
            }
        };
        let session_id = task.session_id.clone().unwrap_or_else(|| session.id.clone());
        let view_url = format!("{}/{}", VIEW_URL_BASE, session_id);
        info!("Task {} created; watch it at {}", task.id, view_url);

        let mut receipt = ApplicationReceipt {
            task_id: Some(task.id.clone()),
            session_id: Some(session_id.clone()),
            view_url: Some(view_url),
            job_count: jobs.len(),
            jobs: jobs.iter().filter_map(JobSummary::from_job).collect(),
            status: Some("started".to_string()),
            output: None,
        };

        if !wait {
            warn!("Session {} keeps running until stopped", session_id);
            return Ok(receipt);
        }

        info!("Waiting for all applications to complete...");
        let finished = self.wait_for_task(&task.id).await;
        if let Err(e) = self.stop_session(&session_id).await {
            warn!("Could not stop session {}: {:#}", session_id, e);
        }
        let view = finished.map_err(|e| JobPilotError::Dispatch(format!("{:#}", e)))?;
        info!("Task {} ended with status {}", task.id, view.status);

        receipt.status = Some(view.status);
        receipt.output = view.output;
        Ok(receipt)
    }

    fn name(&self) -> &str {
        "browser-use"
    }
}
