//! Timeout wrappers.

use crate::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Timeout, timeout as tokio_timeout};

/// Execute a future with a timeout.
///
/// The single timeout wrapper used for every bounded wait in the
/// engine: host-service calls, join waits, and the per-run clock. On
/// expiry the future is dropped at its next suspension point and the
/// caller receives [`ResilienceError::Timeout`], never a partial
/// result.
pub async fn timeout<T, F>(duration: Duration, future: F) -> ResilienceResult<T>
where
    F: Future<Output = T>,
{
    tokio_timeout(duration, future)
        .await
        .map_err(|_| ResilienceError::timeout(duration))
}

/// Wrap a future with a timeout without awaiting it, for callers that
/// select over several waits.
pub fn with_timeout<T, F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future<Output = T>,
{
    tokio_timeout(duration, future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_bound() {
        let result = timeout(Duration::from_millis(100), async { "done" }).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn expiry_yields_timeout_error() {
        let result = timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "unreachable"
        })
        .await;

        match result.unwrap_err() {
            ResilienceError::Timeout { duration } => {
                assert_eq!(duration, Duration::from_millis(10));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn with_timeout_is_selectable() {
        let wrapped = with_timeout(Duration::from_millis(100), async { 7 });
        assert_eq!(wrapped.await.unwrap(), 7);
    }
}
