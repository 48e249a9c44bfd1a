//! Bounded retry with exponential backoff for provider calls.
//!
//! Only transient failures (`AppError::is_transient`) are retried. The wait
//! after attempt `n` is `base * 2^(n-1)` clamped to `[min_delay, max_delay]`.

use std::future::Future;
use std::time::Duration;

use placement_core::{AppError, AppResult, RetryConfig};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Exponential term scale
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay: max_delay.max(min_delay),
            base,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            Duration::from_secs_f64(config.multiplier.max(0.0)),
        )
    }

    /// A single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Wait before the attempt following `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        let raw = self.base.saturating_mul(1u32 << exponent);
        raw.clamp(self.min_delay, self.max_delay)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `call` receives the 1-based attempt number. Exhausting the attempts on
    /// transient errors yields `AppError::Unavailable`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 1;

        loop {
            match call(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    warn!(
                        "{} failed after {} attempts: {}",
                        operation, self.max_attempts, e
                    );
                    return Err(AppError::Unavailable(format!(
                        "{} failed after {} attempts: {}",
                        operation, self.max_attempts, e
                    )));
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {}",
                        operation,
                        attempt,
                        self.max_attempts,
                        delay.as_millis(),
                        e
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

    fn fast() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(5),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_default_delays_follow_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        // 1s and 2s are below the 4s floor
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("Lookup", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AppError::Unavailable("503".to_string()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_unavailable() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = fast()
            .run("Lookup", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Timeout("slow".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = fast()
            .run("Lookup", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::InvalidInput("bad".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
