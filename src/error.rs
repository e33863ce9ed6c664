//! Error handling for the jobpilot pipeline

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobPilotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model service rejected the call with a rate-limit status.
    #[error("Rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("Model response error: {0}")]
    ModelResponse(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, JobPilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_is_displayed() {
        let err = JobPilotError::RateLimited {
            retry_after: Some(Duration::from_secs(12)),
            message: "quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "Rate limited: quota exceeded");
    }

    #[test]
    fn test_scrape_error_display() {
        let err = JobPilotError::Scrape("all 6 searches failed".into());
        assert_eq!(err.to_string(), "Scrape error: all 6 searches failed");
    }
}
