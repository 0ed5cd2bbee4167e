//! Limit errors.

use cascade_core::ExecutionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which quota a limit violation crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitKind {
    /// Wall-clock execution time.
    Time,
    /// Step count.
    Steps,
    /// Context size in bytes.
    Context,
    /// Audit-trail length.
    Audit,
    /// Recursion depth.
    Depth,
    /// Concurrent branch count.
    Branches,
    /// Variable count.
    Variables,
    /// Single-variable size.
    VariableSize,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Time => "time",
            Self::Steps => "steps",
            Self::Context => "context",
            Self::Audit => "audit",
            Self::Depth => "depth",
            Self::Branches => "branches",
            Self::Variables => "variables",
            Self::VariableSize => "variable-size",
        };
        f.write_str(name)
    }
}

/// Errors from the limiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// A quota was crossed.
    #[error("{kind} limit exceeded: {used} > {limit}")]
    Exceeded {
        /// Which quota.
        kind: LimitKind,
        /// Observed usage at the moment of the check.
        used: u64,
        /// The configured ceiling.
        limit: u64,
    },

    /// A configuration field was non-positive.
    #[error("limit config field {field} must be positive")]
    InvalidConfig {
        /// The offending field, in document-form naming.
        field: &'static str,
    },

    /// The execution id is not registered with the limiter.
    #[error("unknown execution: {0}")]
    UnknownExecution(ExecutionId),

    /// The execution id is already registered.
    #[error("execution already started: {0}")]
    AlreadyStarted(ExecutionId),
}

impl LimitError {
    /// The crossed quota, for `Exceeded` errors.
    #[must_use]
    pub fn kind(&self) -> Option<LimitKind> {
        match self {
            Self::Exceeded { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
