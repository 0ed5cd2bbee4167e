//! Terminal execution outcomes.

use crate::error::ExecutionError;
use cascade_value::Object;
use serde::{Deserialize, Serialize};

/// How a run (or a fork branch) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    /// The run reached an End component.
    Success,
    /// The run terminated with an error.
    Failure,
    /// The work was not performed (an OR-join loser).
    Skipped,
    /// Some branches succeeded and some failed without failing the run.
    Partial,
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetrics {
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Component dispatches performed.
    pub steps: u64,
    /// Largest observed context size in bytes.
    pub peak_context_bytes: u64,
    /// Audit entries written.
    pub audit_entries: u64,
}

/// The terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// How the run ended.
    pub status: ResultStatus,
    /// Variables collected by the End component's `outputVariables`.
    /// Empty on failure; partial outputs are never leaked.
    pub output_variables: Object,
    /// The terminating error, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    /// Run counters.
    pub metrics: ExecutionMetrics,
}

impl ExecutionResult {
    /// A successful result.
    #[must_use]
    pub fn success(output_variables: Object, metrics: ExecutionMetrics) -> Self {
        Self {
            status: ResultStatus::Success,
            output_variables,
            error: None,
            metrics,
        }
    }

    /// A failed result. Outputs are deliberately omitted.
    #[must_use]
    pub fn failure(error: ExecutionError, metrics: ExecutionMetrics) -> Self {
        Self {
            status: ResultStatus::Failure,
            output_variables: Object::new(),
            error: Some(error),
            metrics,
        }
    }

    /// Returns `true` for successful results.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}
