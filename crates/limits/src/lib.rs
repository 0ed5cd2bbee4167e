#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Cascade Limits
//!
//! Per-execution resource quotas. A [`ResourceLimiter`] tracks usage
//! counters for every live execution and fails fast the moment a
//! threshold crosses, so a runaway flow is stopped at the step that
//! exceeds its budget rather than at some later checkpoint.
//!
//! The limiter is the only shared-mutable object in a run; it is
//! internally synchronized and safe to call from concurrent branch
//! tasks.

pub mod config;
pub mod error;
pub mod limiter;

pub use config::LimitConfig;
pub use error::{LimitError, LimitKind};
pub use limiter::{ExecutionUsage, ResourceLimiter};
