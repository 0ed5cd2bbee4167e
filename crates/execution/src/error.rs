//! The engine's error surface.

use cascade_core::ComponentId;
use cascade_limits::{LimitError, LimitKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable error codes. Every failure the engine can surface
/// maps to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// An Action named a service the registry does not know.
    ServiceNotFound,
    /// A host service handler returned an error and no `"error"` port
    /// was connected to recover it.
    HostServiceFailure,
    /// A Decision condition evaluated to a non-boolean.
    DecisionTypeError,
    /// An expression failed to parse, was rejected by the sanitizer, or
    /// failed to evaluate.
    ExpressionError,
    /// A non-End component's selected output port has no connection.
    NoOutgoingConnection,
    /// Successor resolution produced an inconsistent result, such as
    /// fork branches converging on different joins.
    InvalidSuccessor,
    /// A Join's `timeoutMs` elapsed before its branches arrived.
    JoinTimeout,
    /// The run-loop iteration cap was hit.
    MaxIterationsExceeded,
    /// The per-run wall-clock budget was exhausted.
    TimeoutExceeded,
    /// The run was cancelled.
    Cancelled,
    /// A resource quota was crossed; `ExecutionError::limit` names it.
    ResourceLimitExceeded,
    /// A resume was attempted with an unusable context.
    CannotResume,
    /// A component type without runtime semantics was reached.
    UnsupportedComponentType,
    /// A dispatcher failure that fits no other code, including caught
    /// panics.
    ExecutionException,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ServiceNotFound => "SERVICE_NOT_FOUND",
            Self::HostServiceFailure => "HOST_SERVICE_FAILURE",
            Self::DecisionTypeError => "DECISION_TYPE_ERROR",
            Self::ExpressionError => "EXPRESSION_ERROR",
            Self::NoOutgoingConnection => "NO_OUTGOING_CONNECTION",
            Self::InvalidSuccessor => "INVALID_SUCCESSOR",
            Self::JoinTimeout => "JOIN_TIMEOUT",
            Self::MaxIterationsExceeded => "MAX_ITERATIONS_EXCEEDED",
            Self::TimeoutExceeded => "TIMEOUT_EXCEEDED",
            Self::Cancelled => "CANCELLED",
            Self::ResourceLimitExceeded => "RESOURCE_LIMIT_EXCEEDED",
            Self::CannotResume => "CANNOT_RESUME",
            Self::UnsupportedComponentType => "UNSUPPORTED_COMPONENT_TYPE",
            Self::ExecutionException => "EXECUTION_EXCEPTION",
        };
        f.write_str(name)
    }
}

/// A terminating execution failure.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error(
    "{code}{} at {}: {message}",
    .limit.map(|k| format!("({k})")).unwrap_or_default(),
    .component_id.as_ref().map_or("<run>", |c| c.as_str())
)]
pub struct ExecutionError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
    /// The component being dispatched when the failure occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<ComponentId>,
    /// The crossed quota, for `RESOURCE_LIMIT_EXCEEDED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitKind>,
}

impl ExecutionError {
    /// Create an error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            component_id: None,
            limit: None,
        }
    }

    /// Attach the component being dispatched.
    #[must_use]
    pub fn at(mut self, component_id: ComponentId) -> Self {
        self.component_id = Some(component_id);
        self
    }

    /// A cancellation error.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "execution cancelled")
    }
}

impl From<LimitError> for ExecutionError {
    fn from(err: LimitError) -> Self {
        let (code, limit) = match &err {
            // Wall-clock exhaustion has its own top-level code.
            LimitError::Exceeded {
                kind: LimitKind::Time,
                ..
            } => (ErrorCode::TimeoutExceeded, None),
            LimitError::Exceeded { kind, .. } => {
                (ErrorCode::ResourceLimitExceeded, Some(*kind))
            }
            _ => (ErrorCode::ExecutionException, None),
        };
        Self {
            code,
            message: err.to_string(),
            component_id: None,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_includes_code_and_component() {
        let err = ExecutionError::new(ErrorCode::DecisionTypeError, "condition was a string")
            .at(ComponentId::new("decision-1"));
        assert_eq!(
            err.to_string(),
            "DECISION_TYPE_ERROR at decision-1: condition was a string"
        );
    }

    #[test]
    fn display_without_component_marks_run_level() {
        let err = ExecutionError::new(ErrorCode::Cancelled, "execution cancelled");
        assert_eq!(err.to_string(), "CANCELLED at <run>: execution cancelled");
    }

    #[test]
    fn limit_error_maps_to_resource_code_with_kind() {
        let err: ExecutionError = LimitError::Exceeded {
            kind: LimitKind::Steps,
            used: 4,
            limit: 3,
        }
        .into();
        assert_eq!(err.code, ErrorCode::ResourceLimitExceeded);
        assert_eq!(err.limit, Some(LimitKind::Steps));
        assert!(err.to_string().starts_with("RESOURCE_LIMIT_EXCEEDED(steps)"));
    }

    #[test]
    fn time_limit_maps_to_timeout_code() {
        let err: ExecutionError = LimitError::Exceeded {
            kind: LimitKind::Time,
            used: 31_000,
            limit: 30_000,
        }
        .into();
        assert_eq!(err.code, ErrorCode::TimeoutExceeded);
        assert_eq!(err.limit, None);
    }

    #[test]
    fn code_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::NoOutgoingConnection).unwrap(),
            "\"NO_OUTGOING_CONNECTION\""
        );
    }

    #[test]
    fn serde_roundtrip() {
        let err = ExecutionError::new(ErrorCode::JoinTimeout, "join timed out after 100ms")
            .at(ComponentId::new("join-1"));
        let json = serde_json::to_string(&err).unwrap();
        let back: ExecutionError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
