//! Job sources: the scrape service client and a JSON file loader

use crate::config::ScrapeConfig;
use crate::error::{JobPilotError, Result};
use crate::jobs::dedup::dedupe_by_id;
use crate::jobs::record::JobRecord;
use crate::jobs::sanitizer::sanitize_value;
use anyhow::Context;
use async_trait::async_trait;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Anything that can hand the pipeline a deduplicated list of postings.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>>;

    fn name(&self) -> &str;
}

/// Turn raw scraper objects into sanitized, deduplicated records. A posting
/// that is not an object or does not parse is skipped; the rest are kept.
pub fn prepare_records(raw: Vec<Value>) -> Vec<JobRecord> {
    let mut records = Vec::with_capacity(raw.len());
    for (position, value) in raw.into_iter().enumerate() {
        let Value::Object(map) = value else {
            warn!("Skipping posting {}: not a JSON object", position);
            continue;
        };
        let normalized = sanitize_value(&Value::Object(camel_case_keys(map)));
        let label = normalized
            .get("id")
            .filter(|id| !id.is_null())
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("at position {}", position));
        match JobRecord::from_value(normalized) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping posting {}: {}", label, e),
        }
    }
    dedupe_by_id(records)
}

/// Postings the board did not flag as remote are recognised by their text.
pub fn looks_remote(job: &JobRecord) -> bool {
    if job.is_remote_flagged() {
        return true;
    }
    let location = job.location.as_deref().unwrap_or("").to_lowercase();
    let title = job.title.as_deref().unwrap_or("").to_lowercase();
    let description = job.description.as_deref().unwrap_or("").to_lowercase();

    location.contains("remote")
        || location.contains("anywhere")
        || title.contains("remote")
        || description.contains("remote work")
        || description.contains("work from home")
}

/// Python scrapers emit snake_case keys; records use camelCase.
fn camel_case_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(key, value)| (to_camel_case(&key), value)).collect()
}

fn to_camel_case(key: &str) -> String {
    if !key.contains('_') {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Loads postings from a JSON array on disk.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl JobSource for JsonFileSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        if !self.path.exists() {
            return Err(JobPilotError::InvalidInput(format!(
                "Jobs file does not exist: {}",
                self.path.display()
            )));
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let raw: Vec<Value> = serde_json::from_str(&content)?;
        let jobs = prepare_records(raw);
        info!("Loaded {} jobs from {}", jobs.len(), self.path.display());
        Ok(jobs)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    site_name: &'a str,
    search_term: String,
    location: &'a str,
    results_wanted: usize,
    easy_apply: bool,
    country_indeed: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Wrapped { jobs: Vec<Value> },
    Bare(Vec<Value>),
}

impl SearchResponse {
    fn into_jobs(self) -> Vec<Value> {
        match self {
            SearchResponse::Wrapped { jobs } => jobs,
            SearchResponse::Bare(jobs) => jobs,
        }
    }
}

/// Client for a JobSpy-compatible scrape service, run over every
/// (country, search term) pair.
pub struct ScrapeServiceSource {
    client: reqwest::Client,
    config: ScrapeConfig,
}

impl ScrapeServiceSource {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        if config.countries.is_empty() || config.search_terms.is_empty() {
            return Err(JobPilotError::Configuration(
                "scrape.countries and scrape.search_terms must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn with_results_per_search(mut self, results: usize) -> Self {
        self.config.results_per_search = results;
        self
    }

    fn search_term(&self, term: &str) -> String {
        if self.config.search_suffix.is_empty() {
            term.to_string()
        } else {
            format!("{} {}", term, self.config.search_suffix)
        }
    }

    async fn search(&self, country: &str, term: &str) -> anyhow::Result<Vec<Value>> {
        let request = SearchRequest {
            site_name: &self.config.site,
            search_term: self.search_term(term),
            location: "",
            results_wanted: self.config.results_per_search,
            easy_apply: self.config.easy_apply,
            country_indeed: country,
        };
        let response = self
            .client
            .post(&self.config.service_url)
            .json(&request)
            .send()
            .await
            .context("failed to reach scrape service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("scrape service returned {}: {}", status, body);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("failed to parse scrape service response")?;
        Ok(parsed.into_jobs())
    }
}

#[async_trait]
impl JobSource for ScrapeServiceSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        let mut all_jobs = Vec::new();
        let mut failed = 0;
        let total = self.config.countries.len() * self.config.search_terms.len();

        for country in &self.config.countries {
            for term in &self.config.search_terms {
                info!("Searching for \"{}\" in {}...", term, country);
                let raw = match self.search(country, term).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        error!("Error scraping {} in {}: {:#}", term, country, e);
                        failed += 1;
                        continue;
                    }
                };
                let found = raw.len();

                let jobs = prepare_records(raw);
                let kept: Vec<JobRecord> = if self.config.remote_only {
                    jobs.into_iter().filter(looks_remote).collect()
                } else {
                    jobs
                };
                info!("  Found {} raw jobs, kept {} after remote filter", found, kept.len());
                all_jobs.extend(kept);
            }
        }

        if failed == total {
            return Err(JobPilotError::Scrape(format!(
                "all {} searches against {} failed",
                total, self.config.service_url
            )));
        }

        let unique = dedupe_by_id(all_jobs);
        info!("Total unique jobs after deduplication: {}", unique.len());
        Ok(unique)
    }

    fn name(&self) -> &str {
        "scrape-service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case_keys_are_normalized() {
        assert_eq!(to_camel_case("job_url"), "jobUrl");
        assert_eq!(to_camel_case("company_num_employees"), "companyNumEmployees");
        assert_eq!(to_camel_case("jobUrl"), "jobUrl");
        assert_eq!(to_camel_case("_private"), "private");
    }

    #[test]
    fn test_prepare_records_sanitizes_and_dedupes() {
        let raw = vec![
            json!({"id": "1", "title": "Old", "job_url": "https://a", "company_logo": "x"}),
            json!({"id": "2", "title": "Other", "skills": ["go"]}),
            json!({"id": "1", "title": "New", "job_url": "https://a"}),
        ];

        let jobs = prepare_records(raw);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title.as_deref(), Some("New"));
        assert_eq!(jobs[0].job_url.as_deref(), Some("https://a"));
        assert!(!jobs[1].extra.contains_key("skills"));
    }

    #[test]
    fn test_unparseable_postings_are_skipped_and_the_rest_kept() {
        let raw = vec![
            json!({"id": "1", "title": "Rust Dev", "job_url": "https://a"}),
            json!({"id": "2", "job_type": ["fulltime"]}),
            json!({"id": null}),
            json!({"id": "4", "min_amount": "lots"}),
            json!("just a string"),
            json!({"id": 5, "title": "Numeric id"}),
        ];

        let jobs = prepare_records(raw);
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "5"]);
        assert_eq!(jobs[0].job_url.as_deref(), Some("https://a"));
    }

    #[tokio::test]
    async fn test_every_search_failing_is_a_scrape_error() {
        let config = ScrapeConfig {
            service_url: "http://127.0.0.1:9/scrape".to_string(),
            countries: vec!["Singapore".to_string()],
            search_terms: vec!["Rust".to_string()],
            request_timeout_secs: 2,
            ..ScrapeConfig::default()
        };
        let source = ScrapeServiceSource::new(config).unwrap();
        assert!(matches!(source.fetch_jobs().await, Err(JobPilotError::Scrape(_))));
    }

    #[test]
    fn test_remote_detection() {
        let flagged = JobRecord::from_value(json!({"id": "1", "isRemote": true})).unwrap();
        let by_location = JobRecord::new("2").with_location("Anywhere in APAC");
        let by_description = JobRecord::new("3").with_description("We support Work From Home days");
        let onsite = JobRecord::new("4")
            .with_location("Singapore")
            .with_title("Backend Engineer")
            .with_description("Office based role");

        assert!(looks_remote(&flagged));
        assert!(looks_remote(&by_location));
        assert!(looks_remote(&by_description));
        assert!(!looks_remote(&onsite));
    }

    #[test]
    fn test_search_term_suffix() {
        let source = ScrapeServiceSource::new(ScrapeConfig::default()).unwrap();
        assert_eq!(source.search_term("AI Engineer"), "AI Engineer remote");
    }

    #[test]
    fn test_empty_search_matrix_is_a_configuration_error() {
        let config = ScrapeConfig {
            countries: vec![],
            ..ScrapeConfig::default()
        };
        assert!(matches!(
            ScrapeServiceSource::new(config),
            Err(JobPilotError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_json_file_source_missing_file() {
        let source = JsonFileSource::new("does/not/exist.json");
        assert!(source.fetch_jobs().await.is_err());
    }
}
