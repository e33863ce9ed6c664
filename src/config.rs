//! Configuration management for jobpilot

use crate::error::{JobPilotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub classifier: ClassifierConfig,
    pub preferences: PreferencesConfig,
    pub scrape: ScrapeConfig,
    pub apply: ApplyConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub batch_size: usize,
    pub inter_batch_delay_ms: u64,
    pub min_batch_delay_ms: u64,
    pub max_description_chars: usize,
    pub max_attempts: u32,
    pub default_rate_limit_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub service_url: String,
    pub site: String,
    pub countries: Vec<String>,
    pub search_terms: Vec<String>,
    /// Appended to every search term, e.g. "remote".
    pub search_suffix: String,
    pub results_per_search: usize,
    pub easy_apply: bool,
    pub remote_only: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    pub api_base: String,
    pub api_key_env: String,
    pub profile_id_env: String,
    pub proxy_country_code: String,
    pub availability_window: String,
    pub applicant_facts: Vec<String>,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub cron_secret_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        // 15 requests per minute on the free tier: one request every 5s stays under it.
        Self {
            batch_size: 10,
            inter_batch_delay_ms: 5_000,
            min_batch_delay_ms: 1_000,
            max_description_chars: 500,
            max_attempts: 3,
            default_rate_limit_delay_ms: 65_000,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000/api/v1/search_jobs".to_string(),
            site: "indeed".to_string(),
            countries: vec!["Singapore".to_string(), "Philippines".to_string()],
            search_terms: vec![
                "software engineer".to_string(),
                "full-stack developer".to_string(),
                "AI Engineer".to_string(),
            ],
            search_suffix: "remote".to_string(),
            results_per_search: 10,
            easy_apply: true,
            remote_only: true,
            request_timeout_secs: 120,
        }
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.browser-use.com/api/v2".to_string(),
            api_key_env: "BROWSER_USE_API_KEY".to_string(),
            profile_id_env: "BROWSER_PROFILE_ID".to_string(),
            proxy_country_code: "us".to_string(),
            availability_window: "5PM to 9PM PH time".to_string(),
            applicant_facts: vec![
                "3 years of AI/ML Experience".to_string(),
                "4 years of Software Engineering Experience".to_string(),
                "Able to start working immediately".to_string(),
                "Able to work remotely".to_string(),
                "Able to work full-time/part-time".to_string(),
            ],
            poll_interval_secs: 5,
            max_wait_secs: 1_800,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            cron_secret_env: "CRON_SECRET".to_string(),
        }
    }
}

impl ClassifierConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn min_batch_delay(&self) -> Duration {
        Duration::from_millis(self.min_batch_delay_ms)
    }

    pub fn default_rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.default_rate_limit_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(JobPilotError::Configuration(
                "classifier.batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(JobPilotError::Configuration(
                "classifier.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load from `config_path`, writing defaults there on first use.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            config
        };
        config.apply_env_overrides()?;
        config.classifier.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| JobPilotError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("jobpilot")
            .join("config.toml")
    }

    /// Batch-size and pacing overrides from the environment.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(size) = env_number::<usize>("JOBPILOT_BATCH_SIZE")? {
            self.classifier.batch_size = size;
        }
        if let Some(delay) = env_number::<u64>("JOBPILOT_BATCH_DELAY_MS")? {
            self.classifier.inter_batch_delay_ms = delay;
        }
        Ok(())
    }

    pub fn cron_secret(&self) -> Option<String> {
        optional_env(&self.server.cron_secret_env)
    }
}

/// Read a required, non-blank environment variable.
pub fn required_env(name: &str) -> Result<String> {
    optional_env(name).ok_or_else(|| {
        JobPilotError::Configuration(format!("{} environment variable is not set", name))
    })
}

pub fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match optional_env(name) {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            JobPilotError::Configuration(format!("{} must be a number, got '{}'", name, raw))
        }),
        None => Ok(None),
    }
}
