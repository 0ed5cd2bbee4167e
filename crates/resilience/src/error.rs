//! Resilience errors.

use std::time::Duration;
use thiserror::Error;

/// Errors from the resilience primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    /// A bounded wait elapsed.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The bound that elapsed.
        duration: Duration,
    },

    /// Every retry attempt failed.
    #[error("all {attempts} attempts failed: {last_error}")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The final attempt's error.
        last_error: String,
    },

    /// The operation was cancelled between attempts.
    #[error("operation cancelled")]
    Cancelled,
}

impl ResilienceError {
    /// Build a timeout error.
    #[must_use]
    pub const fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }
}
