use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards the mail collaborator: once it keeps failing, stop hammering it
// and fail fast until a cooldown elapses.
//
// States:
// - Closed: requests pass through
// - Open: requests rejected immediately
// - HalfOpen: probing recovery after the cooldown
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Cooldown before probing recovery.
    pub cooldown: Duration,
    /// Successes needed in half-open before closing again.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

struct Inner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Mutex<Inner>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Run `operation` if the circuit allows it.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == CircuitState::Open {
                let cooled_down = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.cooldown);
                if !cooled_down {
                    return Err(CircuitBreakerError::CircuitOpen);
                }
                tracing::info!("Circuit breaker transitioning to half-open");
                inner.state = CircuitState::HalfOpen;
                inner.successes = 0;
            }
        }

        match operation.await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(error) => {
                self.record_failure().await;
                Err(CircuitBreakerError::OperationFailed(error))
            }
        }
    }

    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.successes += 1;
                if inner.successes >= self.config.success_threshold {
                    tracing::info!("Circuit breaker closed after recovery");
                    inner.state = CircuitState::Closed;
                    inner.failures = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Closed => inner.failures = 0,
            CircuitState::Open => {}
        }
    }

    async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.failures += 1;
        inner.opened_at = Some(Instant::now());

        match inner.state {
            CircuitState::Closed if inner.failures >= self.config.failure_threshold => {
                tracing::warn!(failures = inner.failures, "Circuit breaker opened");
                inner.state = CircuitState::Open;
            }
            CircuitState::HalfOpen => {
                tracing::warn!("Failure while half-open, reopening circuit");
                inner.state = CircuitState::Open;
                inner.successes = 0;
            }
            _ => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CircuitOpen => write!(f, "Circuit breaker is open"),
            Self::OperationFailed(e) => write!(f, "Operation failed: {e}"),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown: Duration::from_secs(5),
            success_threshold: 1,
        });

        for _ in 0..3 {
            let _ = breaker.call(async { Err::<(), _>("smtp down") }).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        let result = breaker.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_recovers_through_half_open() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            cooldown: Duration::from_millis(50),
            success_threshold: 1,
        });

        for _ in 0..2 {
            let _ = breaker.call(async { Err::<(), _>("smtp down") }).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let result = breaker.call(async { Ok::<_, &str>(()) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            cooldown: Duration::from_secs(5),
            success_threshold: 1,
        });

        let _ = breaker.call(async { Err::<(), _>("blip") }).await;
        let _ = breaker.call(async { Ok::<_, &str>(()) }).await;
        let _ = breaker.call(async { Err::<(), _>("blip") }).await;

        // Never two consecutive failures, so still closed.
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
