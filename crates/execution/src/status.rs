//! Execution-level status tracking.

use serde::{Deserialize, Serialize};

/// The overall status of a flow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Created but not yet started.
    NotStarted,
    /// Actively stepping components.
    Running,
    /// Suspended with a resumable context.
    Paused,
    /// Reached an End component.
    Completed,
    /// Terminated by an error.
    Failed,
    /// Terminated by cancellation.
    Cancelled,
}

impl ExecutionStatus {
    /// Returns `true` once the execution can never advance again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` while stepping.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns `true` for contexts [`resume`](crate::ExecutionContext)
    /// accepts: started but not finished.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
