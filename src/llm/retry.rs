//! Retry policy shared by every model call
//!
//! Exponential backoff: the delay before retry `n` (1-based) is
//! `initial_delay * exp_base^(n-1)`, capped at `max_delay`. Only the
//! configured HTTP statuses and transport failures are retried.

use crate::config::RetrySection;
use crate::llm::provider::LlmError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub exp_base: f64,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub http_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySection::default())
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        Self {
            attempts: section.attempts.max(1),
            exp_base: section.exp_base,
            initial_delay: Duration::from_millis(section.initial_delay_ms),
            max_delay: Duration::from_millis(section.max_delay_ms),
            http_status_codes: section.http_status_codes.clone(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the given retry (1-based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let factor = self.exp_base.powi(exponent);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.http_status_codes.contains(&status)
    }

    pub fn is_retryable(&self, error: &LlmError) -> bool {
        match error {
            LlmError::HttpStatus { status, .. } => self.is_retryable_status(*status),
            LlmError::NetworkError(_) => true,
            _ => false,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, provider: &str, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(provider, attempt, "Model call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !self.is_retryable(&e) => {
                    error!(provider, attempt, error = %e, "Non-retryable model error");
                    return Err(e);
                }
                Err(e) if attempt >= self.attempts => {
                    error!(provider, attempts = attempt, error = %e, "Model call failed after all retries");
                    return Err(LlmError::RetriesExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_retry(attempt);
                    warn!(
                        provider,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            exp_base: 7.0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            http_status_codes: vec![429, 500, 503, 504],
        }
    }

    #[test]
    fn test_default_delays_grow_by_exp_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(7));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(49));
        // 343s is above the 60s ceiling
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(60));
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        for status in [429, 500, 503, 504] {
            assert!(policy.is_retryable_status(status));
        }
        for status in [400, 401, 403, 404, 502] {
            assert!(!policy.is_retryable_status(status));
        }
        assert!(policy.is_retryable(&LlmError::NetworkError("reset".to_string())));
        assert!(!policy.is_retryable(&LlmError::InvalidResponse("bad".to_string())));
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast_policy(5)
            .run("test", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(LlmError::HttpStatus {
                        status: 503,
                        body: String::new(),
                    })
                } else {
                    Ok("ok")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast_policy(5)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::HttpStatus {
                    status: 400,
                    body: "bad request".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(LlmError::HttpStatus { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast_policy(3)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::HttpStatus {
                    status: 429,
                    body: String::new(),
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(LlmError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
