//! Cancel-aware retry with exponential backoff.

use crate::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry schedule: exponential backoff with a delay ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failure.
    pub backoff_multiplier: f64,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// The delay before the given (1-indexed) retry.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

/// Run an operation under a retry policy.
///
/// Between attempts the backoff sleep races the cancellation token; a
/// cancelled run never waits out a backoff delay.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancellation: &CancellationToken,
    mut operation: F,
) -> ResilienceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut last_error = String::new();

    for attempt in 0..policy.max_attempts {
        if cancellation.is_cancelled() {
            return Err(ResilienceError::Cancelled);
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_error = err.to_string();
                tracing::debug!(attempt, error = %last_error, "retry attempt failed");
            }
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay_for(attempt + 1);
            tokio::select! {
                () = cancellation.cancelled() => return Err(ResilienceError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    Err(ResilienceError::RetriesExhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}
