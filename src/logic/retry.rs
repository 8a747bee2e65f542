//! Retry with exponential backoff and jitter for transient store failures.
//!
//! The store adapter never retries on its own. Callers on the request path
//! wrap each store call in [`retry_with_backoff`], which repeats only errors
//! that classify themselves as transient.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::StoreError;

/// Errors that know whether repeating the call may succeed.
pub trait Transient: std::fmt::Display {
    fn is_transient(&self) -> bool;
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts including the first one (0 = infinite)
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// Near-zero delays, for tests.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the attempt
/// budget runs out. The last error is returned unchanged.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if config.max_attempts > 0 && attempt >= config.max_attempts {
                    log::error!("{operation_name} failed after {attempt} attempts: {e}");
                    return Err(e);
                }

                // 0.5x to 1.5x of the delay
                let jitter = rand::thread_rng().gen_range(0.5..1.5);
                let jittered_delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

                log::warn!(
                    "{operation_name} failed on attempt {attempt}, retrying in {}ms: {e}",
                    jittered_delay.as_millis()
                );

                tokio::time::sleep(jittered_delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_succeeds_immediately() {
        let config = RetryConfig::immediate(3);
        let result: Result<i32, StoreError> =
            retry_with_backoff(&config, "op", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let result = retry_with_backoff(&RetryConfig::immediate(5), "op", || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Retryable("throttled".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_max_attempts() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let config = RetryConfig::immediate(3);
        let result: Result<i32, StoreError> = retry_with_backoff(&config, "op", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Retryable("always fails".into()))
            }
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let config = RetryConfig::immediate(5);
        let result: Result<i32, StoreError> = retry_with_backoff(&config, "op", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Conflict("doc".into()))
            }
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
