//! Bounded retry with exponential backoff for forum provider calls.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::{Result, RivetError};

/// Maximum attempts per provider call, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

const BASE_DELAY_MS: u64 = 500;

const MAX_DELAY_MS: u64 = 8_000;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    pub fn with_config(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: true,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is exhausted. The last error is returned as-is so callers can
    /// still see rate-limit details.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }

                    attempt += 1;
                    if attempt >= self.max_attempts {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "giving up after retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(&e, attempt);
                    debug!(
                        operation = operation_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient failure"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Server-provided retry-after wins over computed backoff.
    fn delay_for(&self, error: &RivetError, attempt: u32) -> Duration {
        if let RivetError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = error
        {
            let ms = secs.saturating_mul(1_000).min(self.max_delay_ms);
            return Duration::from_millis(ms);
        }
        self.backoff_delay(attempt)
    }

    /// Binary exponential backoff, capped, with optional ±25% jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped = exponential.min(self.max_delay_ms);

        if self.enable_jitter {
            let jitter = (capped / 4) as f64;
            let offset = (rand::random::<f64>() * 2.0 - 1.0) * jitter;
            Duration::from_millis(((capped as f64) + offset).max(0.0) as u64)
        } else {
            Duration::from_millis(capped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn no_jitter(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 10,
            max_delay_ms: MAX_DELAY_MS,
            enable_jitter: false,
        }
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let policy = no_jitter(3);
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();

        let result = policy
            .execute("test", move || {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    Ok::<i32, RivetError>(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = no_jitter(3);
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();

        let result = policy
            .execute("test", move || {
                let counter = counter.clone();
                async move {
                    let mut calls = counter.lock().unwrap();
                    *calls += 1;
                    let current = *calls;
                    drop(calls);

                    if current < 3 {
                        Err(RivetError::Timeout {
                            operation: "search".to_string(),
                            duration_ms: 10,
                        })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let policy = no_jitter(3);
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();

        let result: Result<i32> = policy
            .execute("test", move || {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    Err(RivetError::RateLimited {
                        provider: "stackexchange".to_string(),
                        retry_after_secs: None,
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(RivetError::RateLimited { .. })));
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn permanent_error_stops_immediately() {
        let policy = no_jitter(3);
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();

        let result: Result<i32> = policy
            .execute("test", move || {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    Err(RivetError::InvalidRequest("empty query".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            enable_jitter: false,
        };

        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(4_000));
        assert_eq!(policy.backoff_delay(10), Duration::from_millis(8_000));
    }

    #[test]
    fn retry_after_header_overrides_backoff() {
        let policy = no_jitter(3);
        let error = RivetError::RateLimited {
            provider: "reddit".to_string(),
            retry_after_secs: Some(2),
        };
        assert_eq!(policy.delay_for(&error, 1), Duration::from_millis(2_000));

        let huge = RivetError::RateLimited {
            provider: "reddit".to_string(),
            retry_after_secs: Some(10_000),
        };
        assert_eq!(
            policy.delay_for(&huge, 1),
            Duration::from_millis(MAX_DELAY_MS)
        );
    }
}
