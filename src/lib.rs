//! jobpilot library: job scraping, LLM batch classification and automated applications

pub mod apply;
pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod jobs;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod server;

pub use config::Config;
pub use error::{JobPilotError, Result};
