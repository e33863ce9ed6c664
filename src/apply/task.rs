//! The agentic task handed to the remote browser

use crate::jobs::JobRecord;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Next `weekday` strictly after `today`.
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let from = today.weekday().num_days_from_monday() as i64;
    let to = weekday.num_days_from_monday() as i64;
    let mut days = (to - from + 7) % 7;
    if days == 0 {
        days = 7;
    }
    today + Duration::days(days)
}

/// "Wednesday, January 28, 2026 5PM to 9PM PH time"
pub fn availability_slot(date: NaiveDate, window: &str) -> String {
    format!("{} {}", date.format("%A, %B %-d, %Y"), window)
}

pub struct ApplicationTask<'a> {
    pub jobs: &'a [JobRecord],
    pub applicant_facts: &'a [String],
    pub availability_window: &'a str,
    pub today: NaiveDate,
}

impl<'a> ApplicationTask<'a> {
    pub fn render(&self) -> String {
        let job_list = self
            .jobs
            .iter()
            .filter_map(|job| job.job_url.as_deref())
            .enumerate()
            .map(|(idx, url)| format!("{}. {}", idx + 1, url))
            .collect::<Vec<_>>()
            .join("\n");
        let count = self.jobs.len();

        let wednesday = availability_slot(next_weekday(self.today, Weekday::Wed), self.availability_window);
        let friday = availability_slot(next_weekday(self.today, Weekday::Fri), self.availability_window);
        let mut facts: Vec<String> = self.applicant_facts.iter().map(|f| format!("- {}", f)).collect();
        facts.push(format!("- Only available on {} and {}", wednesday, friday));

        TASK_TEMPLATE
            .replace("{count}", &count.to_string())
            .replace("{job_list}", &job_list)
            .replace("{facts}", &facts.join("\n"))
    }
}

const TASK_TEMPLATE: &str = r#"Apply to several jobs on Indeed. The browser profile carries saved cookies, so you should already be signed in.

VERIFICATION PAGES (Cloudflare and similar):
1. Do not click anything right away; give the page 15-30 seconds to clear on its own
2. If a "Verify you are human" checkbox appears, wait 5 seconds and click it once
3. After clicking, wait another 15-30 seconds
4. Only press "Return home" once verification has finished
5. If still stuck after 60 seconds, refresh the page once
6. If it is still blocked after the refresh, skip that job
7. Never click rapidly on a verification page

BROWSING PACE:
- Move between elements slowly and scroll the way a person would
- Wait 2-3 seconds between page loads
- Pause 1-3 seconds between actions

STEP 1: CHECK THE LOGIN
- Open https://www.indeed.com and let any verification finish
- Look for the account name or profile icon
- If signed in, continue; otherwise sign in with Google

STEP 2: APPLY TO EACH JOB
Apply to these {count} job(s), one at a time:

{job_list}

For each job:
1. Open the job URL and wait 3-5 seconds for it to load
2. Handle any verification page as described above
3. Scroll through the job details
4. Click "Apply" or "Apply now"
5. Fill the required fields, using autofill where available
6. If a file upload (resume, cover letter) is required, skip the job
7. Submit simple forms and wait for the confirmation
8. Wait 3-5 seconds before the next job

RULES:
- Skip a job that stays blocked after 2 attempts
- Stay signed in the whole time
- Skip jobs with file uploads or long multi-page forms
- Complete as many of the {count} applications as possible
- Only apply to the jobs listed above, never to jobs on the home page
- Report each job's status: submitted, skipped, blocked, or error

APPLICANT INFORMATION (use when a form asks):
{facts}"#;
