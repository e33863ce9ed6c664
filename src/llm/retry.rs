//! Retry-with-backoff for rate-limited calls

use crate::error::{JobPilotError, Result};
use log::warn;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first.
    pub max_attempts: u32,
    /// Cooldown used when the server suggests none; long enough to clear a
    /// per-minute quota window.
    pub default_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_delay: Duration::from_secs(65),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, default_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            default_delay,
        }
    }

    pub fn delay_for(&self, suggested: Option<Duration>) -> Duration {
        suggested.unwrap_or(self.default_delay)
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Completed { value: T, attempts: u32, waited: Duration },
    /// Every attempt was rate limited.
    Exhausted { attempts: u32, waited: Duration, last_error: JobPilotError },
    /// A non-rate-limit error; not retried.
    Failed { attempts: u32, waited: Duration, error: JobPilotError },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Completed { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn waited(&self) -> Duration {
        match self {
            RetryOutcome::Completed { waited, .. }
            | RetryOutcome::Exhausted { waited, .. }
            | RetryOutcome::Failed { waited, .. } => *waited,
        }
    }
}

/// Runs `op` until it succeeds, fails with something other than a rate
/// limit, or `policy.max_attempts` calls have been made. Sleeps between
/// rate-limited attempts only, never after the last one.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut waited = Duration::ZERO;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Completed { value, attempts: attempt, waited };
            }
            Err(JobPilotError::RateLimited { retry_after, message }) => {
                if attempt >= max_attempts {
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        waited,
                        last_error: JobPilotError::RateLimited { retry_after, message },
                    };
                }
                let delay = policy.delay_for(retry_after);
                warn!(
                    "Rate limited ({}). Waiting {}s before retry {}/{}",
                    message,
                    delay.as_secs_f64().round(),
                    attempt + 1,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
                waited += delay;
            }
            Err(error) => {
                return RetryOutcome::Failed { attempts: attempt, waited, error };
            }
        }
    }
}
