//! One scrape, classify and apply pass

use crate::apply::{ApplicationDispatcher, ApplicationReceipt};
use crate::error::{JobPilotError, Result};
use crate::jobs::{JobRecord, JobSource};
use crate::llm::classifier::{BatchOutcome, Classifier, Match};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub const NO_JOBS_MESSAGE: &str = "No jobs found matching criteria";
pub const NO_MATCHES_MESSAGE: &str = "No jobs matched user preferences";
pub const COMPLETED_MESSAGE: &str = "Cron job completed successfully";

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Block until the remote application task finishes.
    pub wait: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { wait: true }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub success: bool,
    pub message: String,
    pub jobs_scraped: usize,
    pub jobs_matched: usize,
    pub jobs_applied: usize,
    pub matches: Vec<Match>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ApplicationReceipt>,
    pub batches: Vec<BatchOutcome>,
    pub duration_ms: u64,
}

impl PipelineReport {
    fn empty(message: &str, jobs_scraped: usize) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            jobs_scraped,
            jobs_matched: 0,
            jobs_applied: 0,
            matches: Vec::new(),
            receipt: None,
            batches: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Source, classifier and dispatcher wired for repeated passes.
pub struct Pipeline {
    source: Arc<dyn JobSource>,
    classifier: Classifier,
    dispatcher: Arc<dyn ApplicationDispatcher>,
    preferences: String,
}

impl Pipeline {
    /// Fails when the preference text is blank, before anything is fetched.
    pub fn new(
        source: Arc<dyn JobSource>,
        classifier: Classifier,
        dispatcher: Arc<dyn ApplicationDispatcher>,
        preferences: impl Into<String>,
    ) -> Result<Self> {
        let preferences = preferences.into();
        if preferences.trim().is_empty() {
            return Err(JobPilotError::Configuration(
                "Job preferences are empty".to_string(),
            ));
        }
        Ok(Self {
            source,
            classifier,
            dispatcher,
            preferences,
        })
    }

    pub async fn run(&self, options: RunOptions) -> Result<PipelineReport> {
        let started = Instant::now();
        info!("Starting pipeline run with source '{}'", self.source.name());

        let jobs = self.source.fetch_jobs().await?;
        info!("Scraped {} jobs", jobs.len());
        if jobs.is_empty() {
            let mut report = PipelineReport::empty(NO_JOBS_MESSAGE, 0);
            report.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        let outcome = self.classifier.classify_detailed(&jobs, &self.preferences).await?;
        for batch in outcome.failed_batches() {
            warn!(
                "Batch {} ({} jobs) ended as {:?} after {} attempt(s)",
                batch.index + 1,
                batch.job_count,
                batch.status,
                batch.attempts
            );
        }
        info!("Found {} jobs matching user preferences", outcome.matches.len());

        if outcome.matches.is_empty() {
            let mut report = PipelineReport::empty(NO_MATCHES_MESSAGE, jobs.len());
            report.batches = outcome.batches;
            report.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        let to_apply: Vec<JobRecord> = outcome.matches.iter().map(|m| m.job.clone()).collect();
        info!(
            "Dispatching {} job(s) through '{}'",
            to_apply.len(),
            self.dispatcher.name()
        );
        let receipt = self.dispatcher.dispatch(&to_apply, options.wait).await?;
        if receipt.job_count < to_apply.len() {
            warn!(
                "{} of {} matched job(s) were not dispatched",
                to_apply.len() - receipt.job_count,
                to_apply.len()
            );
        }

        Ok(PipelineReport {
            success: true,
            message: COMPLETED_MESSAGE.to_string(),
            jobs_scraped: jobs.len(),
            jobs_matched: outcome.matches.len(),
            jobs_applied: receipt.job_count,
            matches: outcome.matches,
            receipt: Some(receipt),
            batches: outcome.batches,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}
