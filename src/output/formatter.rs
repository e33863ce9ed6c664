//! Output formatters for run reports and classification results

use crate::error::Result;
use crate::llm::classifier::{BatchStatus, ClassificationOutcome, Match};
use crate::pipeline::PipelineReport;
use colored::{Color, Colorize};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

/// Trait for rendering what a command produced
pub trait OutputFormatter {
    fn format_report(&self, report: &PipelineReport) -> Result<String>;
    fn format_classification(&self, outcome: &ClassificationOutcome, jobs_total: usize) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with colors
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

/// JSON formatter for scripting
pub struct JsonFormatter {
    pretty: bool,
}

pub fn formatter_for(format: OutputFormat, use_colors: bool, detailed: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter::new(use_colors, detailed)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str) -> String {
        if self.use_colors {
            format!("\n{} {}\n", "█".blue().bold(), title.blue().bold())
        } else {
            format!("\n█ {}\n", title)
        }
    }

    fn format_matches(&self, matches: &[Match]) -> String {
        let mut output = String::new();
        for (idx, m) in matches.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} at {}\n",
                idx + 1,
                self.colorize(m.job.title_or_na(), Color::Green),
                m.job.company_or_na()
            ));
            if let Some(location) = m.job.location.as_deref() {
                output.push_str(&format!("     Location: {}\n", location));
            }
            if let Some(url) = m.job.job_url.as_deref() {
                output.push_str(&format!("     {}\n", self.colorize(url, Color::Cyan)));
            }
            if self.detailed && !m.reasoning().is_empty() {
                output.push_str(&format!("     Why: {}\n", m.reasoning()));
            }
        }
        output
    }

    fn format_batches(&self, outcome_batches: &[crate::llm::classifier::BatchOutcome]) -> String {
        let mut output = String::new();
        for batch in outcome_batches {
            let status = match &batch.status {
                BatchStatus::Success => self.colorize("ok", Color::Green),
                BatchStatus::RateLimited => self.colorize("rate limited", Color::Yellow),
                BatchStatus::Failed(reason) => self.colorize(&format!("failed: {}", reason), Color::Red),
            };
            output.push_str(&format!(
                "  Batch {}: {} jobs, {} matched, {} attempt(s), {}\n",
                batch.index + 1,
                batch.job_count,
                batch.matched,
                batch.attempts,
                status
            ));
            if !batch.missing_indices.is_empty() {
                output.push_str(&format!("     No verdict for positions {:?}\n", batch.missing_indices));
            }
        }
        output
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &PipelineReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("JOB PILOT RUN"));
        output.push_str(&format!("{}\n", report.message));
        output.push_str(&format!(
            "Scraped: {} | Matched: {} | Applied: {} | {}ms\n",
            report.jobs_scraped, report.jobs_matched, report.jobs_applied, report.duration_ms
        ));

        if !report.matches.is_empty() {
            output.push_str(&self.format_header("Matches"));
            output.push_str(&self.format_matches(&report.matches));
        }

        if self.detailed && !report.batches.is_empty() {
            output.push_str(&self.format_header("Batches"));
            output.push_str(&self.format_batches(&report.batches));
        }

        if let Some(receipt) = &report.receipt {
            output.push_str(&self.format_header("Applications"));
            if let Some(task_id) = &receipt.task_id {
                output.push_str(&format!("Task: {}\n", task_id));
            }
            if let Some(view_url) = &receipt.view_url {
                output.push_str(&format!("View: {}\n", self.colorize(view_url, Color::Cyan)));
            }
            if let Some(status) = &receipt.status {
                output.push_str(&format!("Status: {}\n", status));
            }
            for job in &receipt.jobs {
                output.push_str(&format!("  - {} at {}\n", job.title, job.company));
            }
            if let Some(text) = &receipt.output {
                output.push_str(&format!("\n{}\n", text));
            }
        }

        Ok(output)
    }

    fn format_classification(&self, outcome: &ClassificationOutcome, jobs_total: usize) -> Result<String> {
        let mut output = String::new();
        output.push_str(&self.format_header("CLASSIFICATION"));
        output.push_str(&format!(
            "{} of {} jobs match your preferences\n",
            outcome.matches.len(),
            jobs_total
        ));
        output.push_str(&self.format_matches(&outcome.matches));

        let failed = outcome.failed_batches().count();
        if failed > 0 {
            output.push_str(&self.colorize(
                &format!("\n{} batch(es) produced no verdicts\n", failed),
                Color::Yellow,
            ));
        }
        if self.detailed {
            output.push_str(&self.format_header("Batches"));
            output.push_str(&self.format_batches(&outcome.batches));
        }
        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &PipelineReport) -> Result<String> {
        self.render(report)
    }

    fn format_classification(&self, outcome: &ClassificationOutcome, _jobs_total: usize) -> Result<String> {
        self.render(outcome)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}
