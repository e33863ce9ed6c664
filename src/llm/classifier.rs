//! Batch classification of job postings against free-text preferences
//!
//! Jobs are split into fixed-size batches, one model call per batch, strictly
//! in order. Rate limits are retried with backoff; every other per-batch
//! failure costs that batch its matches but never aborts the run. Only a
//! missing preference text (or an invalid batch size) is reported as an
//! error.

use crate::config::ClassifierConfig;
use crate::error::{JobPilotError, Result};
use crate::jobs::JobRecord;
use crate::llm::client::{classification_schema, ModelClient, ModelRequest};
use crate::llm::prompts::PromptTemplates;
use crate::llm::retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
use log::{debug, error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The model's verdict on one job of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Position in the batch; meaningless outside it.
    #[serde(deserialize_with = "whole_number")]
    pub job_index: i64,
    pub matches_preferences: bool,
    #[serde(default)]
    pub reasoning: String,
}

/// Accepts `3` and `3.0`, rejects fractions and non-numbers.
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(D::Error::custom(format!("jobIndex must be a whole number, got {}", value))),
    }
}

/// A job the model said matches, with its reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub job: JobRecord,
    pub match_result: ClassificationResult,
}

impl Match {
    pub fn reasoning(&self) -> &str {
        &self.match_result.reasoning
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum BatchStatus {
    Success,
    /// Rate limited on every attempt.
    RateLimited,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub index: usize,
    pub job_count: usize,
    pub attempts: u32,
    pub status: BatchStatus,
    pub matched: usize,
    /// Batch positions the model returned no verdict for.
    pub missing_indices: Vec<usize>,
    pub rate_limit_wait_ms: u64,
}

/// Matches plus what happened to each batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassificationOutcome {
    pub matches: Vec<Match>,
    pub batches: Vec<BatchOutcome>,
}

impl ClassificationOutcome {
    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.batches.iter().filter(|b| b.status != BatchStatus::Success)
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub model: String,
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    pub min_batch_delay: Duration,
    pub max_description_chars: usize,
    pub retry: RetryPolicy,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::from_config("gemini-3-flash-preview", &ClassifierConfig::default())
    }
}

impl ClassifierSettings {
    pub fn from_config(model: &str, config: &ClassifierConfig) -> Self {
        Self {
            model: model.to_string(),
            batch_size: config.batch_size,
            inter_batch_delay: config.inter_batch_delay(),
            min_batch_delay: config.min_batch_delay(),
            max_description_chars: config.max_description_chars,
            retry: RetryPolicy::new(config.max_attempts, config.default_rate_limit_delay()),
        }
    }
}

pub struct Classifier {
    client: Arc<dyn ModelClient>,
    settings: ClassifierSettings,
    prompts: PromptTemplates,
}

impl Classifier {
    pub fn new(client: Arc<dyn ModelClient>, settings: ClassifierSettings) -> Self {
        let prompts = PromptTemplates::default().with_max_description_chars(settings.max_description_chars);
        Self {
            client,
            settings,
            prompts,
        }
    }

    /// Jobs matching `preferences`, in input order.
    pub async fn classify(&self, jobs: &[JobRecord], preferences: &str) -> Result<Vec<Match>> {
        Ok(self.classify_detailed(jobs, preferences).await?.matches)
    }

    pub async fn classify_detailed(&self, jobs: &[JobRecord], preferences: &str) -> Result<ClassificationOutcome> {
        if preferences.trim().is_empty() {
            return Err(JobPilotError::Configuration(
                "user preferences are empty; set USER_PREFERENCES or preferences.text".to_string(),
            ));
        }
        if self.settings.batch_size == 0 {
            return Err(JobPilotError::Configuration(
                "classifier batch size must be at least 1".to_string(),
            ));
        }

        let mut outcome = ClassificationOutcome::default();
        if jobs.is_empty() {
            return Ok(outcome);
        }

        let batches = partition(jobs, self.settings.batch_size);
        info!(
            "Classifying {} jobs in {} batches of up to {} ({}ms between batches)",
            jobs.len(),
            batches.len(),
            self.settings.batch_size,
            self.settings.inter_batch_delay.as_millis()
        );

        let run_started = Instant::now();
        for (index, batch) in batches.iter().enumerate() {
            let batch_started = Instant::now();
            let (matches, batch_outcome) = self.classify_batch(index, batch, preferences).await;
            outcome.matches.extend(matches);
            outcome.batches.push(batch_outcome);

            if index + 1 < batches.len() {
                let wait = pacing_delay(
                    self.settings.inter_batch_delay,
                    batch_started.elapsed(),
                    self.settings.min_batch_delay,
                );
                debug!("Waiting {}ms before batch {}", wait.as_millis(), index + 2);
                tokio::time::sleep(wait).await;
            }
        }

        info!(
            "Finished {} batches in {}s: {}/{} jobs matched",
            batches.len(),
            run_started.elapsed().as_secs(),
            outcome.matches.len(),
            jobs.len()
        );
        Ok(outcome)
    }

    async fn classify_batch(&self, index: usize, batch: &[JobRecord], preferences: &str) -> (Vec<Match>, BatchOutcome) {
        let request = ModelRequest {
            model: self.settings.model.clone(),
            prompt: self.prompts.render_batch(batch, preferences),
            response_schema: classification_schema(),
        };
        if let Some(first) = batch.first() {
            debug!(
                "Batch {} sample: {} at {} ({})",
                index + 1,
                first.title_or_na(),
                first.company_or_na(),
                first.location.as_deref().unwrap_or("N/A")
            );
        }

        let client = &self.client;
        let request = &request;
        let retried = retry_with_backoff(&self.settings.retry, move |attempt| async move {
            info!("Processing batch {} ({} jobs), attempt {}", index + 1, batch.len(), attempt);
            client.generate(request).await
        })
        .await;

        let mut batch_outcome = BatchOutcome {
            index,
            job_count: batch.len(),
            attempts: retried.attempts(),
            status: BatchStatus::Success,
            matched: 0,
            missing_indices: Vec::new(),
            rate_limit_wait_ms: retried.waited().as_millis() as u64,
        };

        let response = match retried {
            RetryOutcome::Completed { value, .. } => value,
            RetryOutcome::Exhausted { attempts, last_error, .. } => {
                error!(
                    "Batch {}: still rate limited after {} attempts ({}), skipping it",
                    index + 1,
                    attempts,
                    last_error
                );
                batch_outcome.status = BatchStatus::RateLimited;
                return (Vec::new(), batch_outcome);
            }
            RetryOutcome::Failed { error: e, .. } => {
                error!("Batch {} failed: {}", index + 1, e);
                batch_outcome.status = BatchStatus::Failed(e.to_string());
                return (Vec::new(), batch_outcome);
            }
        };

        let results = match parse_results(&response.text) {
            Ok(results) => results,
            Err(e) => {
                error!("Batch {}: could not parse model response: {}", index + 1, e);
                debug!("Raw response: {}", crate::llm::prompts::truncate_text(&response.text, 500));
                batch_outcome.status = BatchStatus::Failed(e.to_string());
                return (Vec::new(), batch_outcome);
            }
        };

        let (matches, missing) = reassociate(batch, &results);
        for (pos, job) in batch.iter().enumerate() {
            match find_result(&results, pos) {
                Some(r) => info!(
                    "  {} [{}] {} at {}: {}",
                    if r.matches_preferences { "match" } else { "no match" },
                    pos,
                    job.title_or_na(),
                    job.company_or_na(),
                    r.reasoning
                ),
                None => warn!(
                    "  [{}] {} at {}: no verdict returned by the model",
                    pos,
                    job.title_or_na(),
                    job.company_or_na()
                ),
            }
        }
        for stray in results.iter().filter(|r| r.job_index < 0 || r.job_index as usize >= batch.len()) {
            debug!("Batch {}: ignoring verdict for out-of-range index {}", index + 1, stray.job_index);
        }

        info!("Batch {}: {}/{} jobs matched", index + 1, matches.len(), batch.len());
        batch_outcome.matched = matches.len();
        batch_outcome.missing_indices = missing;
        (matches, batch_outcome)
    }
}

/// Contiguous batches of at most `size`, in order.
pub fn partition<T>(items: &[T], size: usize) -> Vec<&[T]> {
    if size == 0 {
        return Vec::new();
    }
    items.chunks(size).collect()
}

/// Time still owed to the pacing budget after a batch took `elapsed`.
pub fn pacing_delay(target: Duration, elapsed: Duration, floor: Duration) -> Duration {
    target.saturating_sub(elapsed).max(floor)
}

/// Remove Markdown code fences the model may wrap its JSON in.
pub fn strip_code_fences(text: &str) -> String {
    match Regex::new(r"(?i)```(?:json)?[ \t]*\r?\n?") {
        Ok(re) => re.replace_all(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

pub fn parse_results(text: &str) -> Result<Vec<ClassificationResult>> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| JobPilotError::ModelResponse(format!("malformed verdict array: {}", e)))
}

fn find_result(results: &[ClassificationResult], position: usize) -> Option<&ClassificationResult> {
    results.iter().find(|r| r.job_index == position as i64)
}

/// Pair each job with the verdict for its position. Returns the matches and
/// the positions that had no verdict at all.
pub fn reassociate(batch: &[JobRecord], results: &[ClassificationResult]) -> (Vec<Match>, Vec<usize>) {
    let mut matches = Vec::new();
    let mut missing = Vec::new();

    for (pos, job) in batch.iter().enumerate() {
        match find_result(results, pos) {
            Some(result) if result.matches_preferences => matches.push(Match {
                job: job.clone(),
                match_result: result.clone(),
            }),
            Some(_) => {}
            None => missing.push(pos),
        }
    }

    (matches, missing)
}
