use std::future::Future;
use std::time::Duration;

use crate::services::gateway::GatewayError;

/// Bounded exponential backoff for gateway calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Each attempt is cut off after this long and counted as a timeout.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = ms.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Whether a failure on attempt `attempt` should be followed by another try.
    pub fn should_retry(&self, attempt: u32, err: &GatewayError) -> bool {
        err.is_transient() && attempt < self.max_attempts
    }

    /// Runs one attempt under the per-attempt timeout.
    pub async fn attempt<T, Fut>(&self, fut: Fut) -> Result<T, GatewayError>
    where
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.attempt_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    /// Runs `op` until it succeeds, fails terminally, or attempts run out.
    /// Returns the last error and the number of attempts made.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, (GatewayError, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt(op()).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt, &e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient gateway failure, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }
}
