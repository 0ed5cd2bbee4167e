#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Cascade Resilience
//!
//! The timing and back-pressure primitives the engine and host services
//! build on:
//!
//! - [`timeout`] / [`with_timeout`] — the single timeout wrapper used at
//!   every bounded wait. A timeout yields a signal, never a partial
//!   result.
//! - [`RetryPolicy`] / [`retry`] — cancel-aware retry with exponential
//!   backoff, for host-service implementations.
//! - [`RateLimiter`] — per-endpoint token buckets returning explicit
//!   allow/deny decisions.

pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod timeout;

pub use error::ResilienceError;
pub use rate_limiter::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use retry::{RetryPolicy, retry};
pub use timeout::{timeout, with_timeout};

/// Result alias for resilience operations.
pub type ResilienceResult<T> = Result<T, ResilienceError>;
