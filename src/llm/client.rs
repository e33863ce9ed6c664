//! Model service seam: request/response envelopes and the client trait

use crate::error::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

/// One structured-output request to the model service.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub prompt: String,
    /// JSON schema the response text is declared to follow.
    pub response_schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub text: String,
}

impl ModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A hosted language model.
///
/// Implementations must report throttling as `JobPilotError::RateLimited`
/// (with the server-suggested delay when one is given) so callers can back off;
/// every other failure is surfaced as-is.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse>;

    fn name(&self) -> &str;
}

/// Schema of a batch verdict array.
pub fn classification_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "jobIndex": {
                    "type": "integer",
                    "description": "The index of the job in the batch (0-based)"
                },
                "matchesPreferences": {
                    "type": "boolean",
                    "description": "Whether the job matches the user's preferences"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Why the job does or does not match the user's preferences"
                }
            },
            "required": ["jobIndex", "matchesPreferences", "reasoning"]
        }
    })
}
