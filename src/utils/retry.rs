use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Exponential Backoff Retry
// ============================================================================
//
// Used for the separately-committed units of work that follow an order
// commit (reward voucher mint). The order itself is never retried here.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Fail fast: two attempts with short delays.
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent,
/// returning the last error. The attempt number is passed in so callers
/// can vary their input per try (e.g. a fresh voucher code).
pub async fn retry_with_backoff<F, Fut, T, E>(config: RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    // The operation always runs at least once, even for max_attempts = 0.
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if attempt == max_attempts => {
                tracing::error!(attempt, error = %error, "Operation failed after all retries");
                return Err(error);
            }
            Err(error) => {
                tracing::warn!(
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying after delay"
                );
                sleep(delay).await;
                delay = Duration::from_millis(
                    ((delay.as_millis() as f64) * config.multiplier) as u64,
                )
                .min(config.max_delay);
            }
        }
    }

    unreachable!("max_attempts is at least 1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_eventually() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(quick(), |_attempt| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient")
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let result: Result<(), _> =
            retry_with_backoff(quick(), |attempt| async move { Err(format!("fail {attempt}")) })
                .await;
        assert_eq!(result, Err("fail 3".to_string()));
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = retry_with_backoff(
            RetryConfig {
                max_attempts: 0,
                ..quick()
            },
            |_attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("down")
                }
            },
        )
        .await;

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_number_is_passed_through() {
        let mut seen = Vec::new();
        let _ = retry_with_backoff(quick(), |attempt| {
            seen.push(attempt);
            async { Err::<(), _>("always") }
        })
        .await;
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
