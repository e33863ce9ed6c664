//! Batch classification prompt

use crate::jobs::JobRecord;
use unicode_segmentation::UnicodeSegmentation;

/// Separator between rendered jobs; the model recovers batch positions from it.
pub const JOB_SEPARATOR: &str = "\n\n---\n\n";

pub const DEFAULT_MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub batch_classification: String,
    pub max_description_chars: usize,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            batch_classification: BATCH_CLASSIFICATION_TEMPLATE.to_string(),
            max_description_chars: DEFAULT_MAX_DESCRIPTION_CHARS,
        }
    }
}

impl PromptTemplates {
    pub fn with_max_description_chars(mut self, max: usize) -> Self {
        self.max_description_chars = max;
        self
    }

    pub fn render_batch(&self, jobs: &[JobRecord], preferences: &str) -> String {
        let rendered_jobs = jobs
            .iter()
            .enumerate()
            .map(|(idx, job)| render_job(idx, job, self.max_description_chars))
            .collect::<Vec<_>>()
            .join(JOB_SEPARATOR);

        self.batch_classification
            .replace("{preferences}", preferences.trim())
            .replace("{count}", &jobs.len().to_string())
            .replace("{last_index}", &jobs.len().saturating_sub(1).to_string())
            .replace("{jobs}", &rendered_jobs)
    }
}

/// One job as the model sees it.
pub fn render_job(index: usize, job: &JobRecord, max_description_chars: usize) -> String {
    let description = job
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| truncate_text(d, max_description_chars))
        .unwrap_or_else(|| "N/A".to_string());

    let mut lines = vec![
        format!("[Job {}]", index),
        format!("Title: {}", or_na(&job.title)),
        format!("Company: {}", or_na(&job.company)),
        format!("Location: {}", or_na(&job.location)),
        format!("Type: {}", or_na(&job.job_type)),
        format!("Description: {}", description),
    ];
    if job.has_salary() {
        lines.push(format!(
            "Salary: {}-{} {}",
            job.min_amount.map(format_amount).unwrap_or_default(),
            job.max_amount.map(format_amount).unwrap_or_default(),
            job.currency.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string());
    }
    lines.join("\n")
}

/// Cut to `max` graphemes, marking the cut with "...".
pub fn truncate_text(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.trim().is_empty()).unwrap_or("N/A")
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
    }
}

const BATCH_CLASSIFICATION_TEMPLATE: &str = r#"User Preferences:
{preferences}

Decide which of the following {count} job postings match the user's preferences.

Jobs:
{jobs}

Respond with a JSON array holding one object for EVERY job, each with:
- jobIndex: the job number (0 to {last_index})
- matchesPreferences: true if the job matches the user's preferences, false if not
- reasoning: a short explanation of why it matches or does not match

IMPORTANT: The array MUST contain all {count} jobs, including the ones that do not match.
Set matchesPreferences to true or false for each job based on the user's preferences."#;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_jobs() -> Vec<JobRecord> {
        vec![
            JobRecord::new("1")
                .with_title("Senior Full Stack Engineer (Remote)")
                .with_company("TechCorp Inc")
                .with_location("Remote - Netherlands")
                .with_description("React, TypeScript and Node.js")
                .with_salary(Some(80000.0), Some(120000.0), Some("EUR")),
            JobRecord::new("2").with_title("AI/ML Engineer"),
        ]
    }

    #[test]
    fn test_batch_prompt_contains_every_job_and_the_preferences() {
        let prompt = PromptTemplates::default().render_batch(&sample_jobs(), "  Remote TypeScript work  ");

        assert!(prompt.starts_with("User Preferences:\nRemote TypeScript work\n"));
        assert!(prompt.contains("[Job 0]\nTitle: Senior Full Stack Engineer (Remote)"));
        assert!(prompt.contains("[Job 1]\nTitle: AI/ML Engineer"));
        assert!(prompt.contains("(0 to 1)"));
        assert!(prompt.contains("all 2 jobs"));
        assert_eq!(prompt.matches(JOB_SEPARATOR).count(), 1);
    }

    #[test]
    fn test_missing_fields_render_as_na_and_salary_is_optional() {
        let rendered = render_job(1, &sample_jobs()[1], 500);
        assert!(rendered.contains("Company: N/A"));
        assert!(rendered.contains("Location: N/A"));
        assert!(rendered.contains("Type: N/A"));
        assert!(rendered.contains("Description: N/A"));
        assert!(!rendered.contains("Salary"));
    }

    #[test]
    fn test_salary_line() {
        let rendered = render_job(0, &sample_jobs()[0], 500);
        assert!(rendered.ends_with("Salary: 80000-120000 EUR"));

        let min_only = JobRecord::new("3").with_salary(Some(1500.5), None, None);
        assert!(render_job(0, &min_only, 500).ends_with("Salary: 1500.50-"));
    }

    #[test]
    fn test_description_is_truncated_with_marker() {
        let long = "a".repeat(600);
        let job = JobRecord::new("4").with_description(long);
        let rendered = render_job(0, &job, 500);

        let line = rendered.lines().find(|l| l.starts_with("Description: ")).unwrap();
        assert_eq!(line.len(), "Description: ".len() + 500 + 3);
        assert!(line.ends_with("..."));
    }

    #[test]
    fn test_truncate_keeps_short_text_and_graphemes_intact() {
        assert_eq!(truncate_text("short", 500), "short");
        assert_eq!(truncate_text("exact", 5), "exact");
        assert_eq!(truncate_text("héllo wörld", 5), "héllo...");
    }
}
