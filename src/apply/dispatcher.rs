//! Application dispatch seam and the dry-run implementation

use crate::error::Result;
use crate::jobs::JobRecord;
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// The part of a job an application task needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub title: String,
    pub company: String,
    pub url: String,
}

impl JobSummary {
    /// `None` when the job has no URL to apply at.
    pub fn from_job(job: &JobRecord) -> Option<Self> {
        let url = job.job_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            title: job.title_or_na().to_string(),
            company: job.company_or_na().to_string(),
            url: url.to_string(),
        })
    }
}

/// What a dispatch produced: remote handles plus the jobs it covered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReceipt {
    pub task_id: Option<String>,
    pub session_id: Option<String>,
    pub view_url: Option<String>,
    pub job_count: usize,
    pub jobs: Vec<JobSummary>,
    pub status: Option<String>,
    pub output: Option<String>,
}

#[async_trait]
pub trait ApplicationDispatcher: Send + Sync {
    /// Start applications for `jobs`; with `wait`, block until the remote
    /// task finishes.
    async fn dispatch(&self, jobs: &[JobRecord], wait: bool) -> Result<ApplicationReceipt>;

    fn name(&self) -> &str;
}

/// Jobs that can be applied to, warning about the rest.
pub fn applicable_jobs(jobs: &[JobRecord]) -> Vec<JobRecord> {
    jobs.iter()
        .filter(|job| {
            let ok = JobSummary::from_job(job).is_some();
            if !ok {
                warn!("Skipping job {} ({}): no job URL", job.id, job.title_or_na());
            }
            ok
        })
        .cloned()
        .collect()
}

/// Logs what would be applied to and touches nothing remote.
pub struct DryRunDispatcher;

#[async_trait]
impl ApplicationDispatcher for DryRunDispatcher {
    async fn dispatch(&self, jobs: &[JobRecord], _wait: bool) -> Result<ApplicationReceipt> {
        let summaries: Vec<JobSummary> = jobs.iter().filter_map(JobSummary::from_job).collect();
        info!("Dry run: would apply to {} job(s)", summaries.len());
        for (idx, job) in summaries.iter().enumerate() {
            info!("   {}. {} at {} ({})", idx + 1, job.title, job.company, job.url);
        }
        Ok(ApplicationReceipt {
            job_count: summaries.len(),
            jobs: summaries,
            status: Some("dry-run".to_string()),
            ..ApplicationReceipt::default()
        })
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
