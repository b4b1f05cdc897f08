//! Bounded retry with a fixed inter-attempt delay

use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,

    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Run an async operation up to `max_attempts` times, sleeping the fixed
/// delay between attempts. The last error is returned when every attempt
/// fails; retry counts are always bounded.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= attempts {
                    warn!(
                        "{}: attempt {}/{} failed, giving up: {}",
                        operation_name, attempt, attempts, e
                    );
                    return Err(e);
                }
                warn!(
                    "{}: attempt {}/{} failed, retrying in {:?}: {}",
                    operation_name, attempt, attempts, config.delay, e
                );
                sleep(config.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_exact_attempt_count_on_persistent_failure() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        };

        let result: Result<(), String> = with_retry(&config, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("boom".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_short_circuits() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 5,
            delay: Duration::from_millis(1),
        };

        let result: Result<u32, String> = with_retry(&config, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 1 {
                    Ok(42)
                } else {
                    Err("first fails".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_clamped_to_one() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 0,
            delay: Duration::from_millis(1),
        };

        let result: Result<(), String> = with_retry(&config, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("boom".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
