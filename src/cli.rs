//! CLI interface for jobpilot

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jobpilot")]
#[command(about = "Scrape job postings, filter them against your preferences with an LLM, and apply")]
#[command(long_about = "Scrape remote job postings, classify them in batches against free-text preferences with Gemini, and hand the matches to a Browser Use agent that applies to them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape, classify and apply in one pass
    Run {
        /// Read postings from a JSON file instead of the scrape service
        #[arg(short, long)]
        jobs_file: Option<PathBuf>,

        /// Results requested per search query
        #[arg(short, long)]
        results_per_search: Option<usize>,

        /// Log what would be applied to without starting a browser session
        #[arg(long)]
        dry_run: bool,

        /// Return as soon as the application task is created
        #[arg(long)]
        no_wait: bool,

        /// Show batch details and reasoning
        #[arg(short, long)]
        detailed: bool,

        /// Output format: console, json
        #[arg(short, long, default_value = "console")]
        output: String,
    },

    /// Classify postings from a JSON file and print the matches
    Classify {
        /// Path to a JSON array of postings
        #[arg(short, long)]
        jobs_file: PathBuf,

        /// Show batch details and reasoning
        #[arg(short, long)]
        detailed: bool,

        /// Output format: console, json
        #[arg(short, long, default_value = "console")]
        output: String,
    },

    /// Serve the cron trigger over HTTP
    Serve {
        /// Address to bind, e.g. 0.0.0.0:3000
        #[arg(short, long)]
        bind: Option<String>,

        /// Answer cron triggers without starting browser sessions
        #[arg(long)]
        dry_run: bool,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file path
    Path,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("Invalid output format: {}. Supported: console, json", format)),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}
