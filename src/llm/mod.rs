//! LLM integration: the model client seam, prompts, retry and the batch classifier

pub mod classifier;
pub mod client;
pub mod gemini;
pub mod prompts;
pub mod retry;

pub use classifier::{Classifier, ClassifierSettings, ClassificationOutcome, ClassificationResult, Match};
pub use client::{ModelClient, ModelRequest, ModelResponse};
pub use gemini::GeminiClient;
