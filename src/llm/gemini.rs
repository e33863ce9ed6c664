//! Gemini `generateContent` client

use crate::config::ModelConfig;
use crate::error::{JobPilotError, Result};
use crate::llm::client::{ModelClient, ModelRequest, ModelResponse};
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
}

impl GeminiClient {
    /// Fails with a configuration error when the key is blank.
    pub fn new(api_key: &str, config: &ModelConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(JobPilotError::Configuration(format!(
                "{} environment variable is not set",
                config.api_key_env
            )));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| JobPilotError::Configuration("invalid Gemini API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Builds a client from the key named in the config.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = crate::config::required_env(&config.api_key_env)?;
        Self::new(&api_key, config)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let model = if request.model.is_empty() { &self.model } else { &request.model };
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &request.prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: &request.response_schema,
            },
        };

        debug!("Calling {} with a {} character prompt", model, request.prompt.len());
        let response = self.client.post(self.endpoint(model)).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let header_delay = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(Duration::from_secs_f64);
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(error_from_response(status, header_delay, &text));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed.text();
        if text.is_empty() {
            return Err(JobPilotError::ModelResponse(
                "Gemini response contained no text".to_string(),
            ));
        }
        Ok(ModelResponse { text })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Map a failed HTTP exchange onto the crate error, separating throttling.
pub fn error_from_response(status: StatusCode, header_delay: Option<Duration>, body: &str) -> JobPilotError {
    let parsed: Option<ErrorEnvelope> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());

    let throttled = status == StatusCode::TOO_MANY_REQUESTS
        || parsed
            .as_ref()
            .map(|e| e.error.status.as_deref() == Some("RESOURCE_EXHAUSTED"))
            .unwrap_or(false);

    if throttled {
        let retry_after = parse_retry_delay(&message)
            .or_else(|| parsed.as_ref().and_then(|e| e.error.retry_info_delay()))
            .or(header_delay);
        return JobPilotError::RateLimited { retry_after, message };
    }

    JobPilotError::ModelResponse(format!("Gemini returned {}: {}", status, message))
}

/// Finds a "retry in 12.5s" hint in an error message.
pub fn parse_retry_delay(message: &str) -> Option<Duration> {
    let re = Regex::new(r"(?i)retry in ([\d.]+)\s*s").ok()?;
    let seconds: f64 = re.captures(message)?.get(1)?.as_str().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_json_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}

impl ErrorBody {
    /// `google.rpc.RetryInfo` carries the delay as a string like "37s".
    fn retry_info_delay(&self) -> Option<Duration> {
        self.details
            .iter()
            .filter_map(|d| d.get("retryDelay").and_then(Value::as_str))
            .find_map(|raw| raw.trim_end_matches('s').parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}
