use crate::config::RetryConfig;
use crate::error::LlmError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Retry a gateway call with exponential backoff. Only transient
    /// failures are retried; request/payload problems surface immediately.
    pub async fn retry<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation,
                            attempts = attempt + 1,
                            "gateway call succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation,
                            attempts = attempt,
                            error = %e,
                            "gateway call failed after max retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation = operation,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "transient gateway failure, retrying"
                    );

                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        })
    }

    #[tokio::test]
    async fn recovers_from_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = fast_policy(3)
            .retry("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LlmError::Timeout)
                } else {
                    Ok("ok")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = fast_policy(2)
            .retry("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::Timeout)
            })
            .await;

        assert!(matches!(result, Err(LlmError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_malformed_responses() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = fast_policy(3)
            .retry("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::MalformedResponse("no choices".to_string()))
            })
            .await;

        assert!(matches!(result, Err(LlmError::MalformedResponse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
