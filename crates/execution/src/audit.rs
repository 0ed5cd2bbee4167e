//! The append-only audit trail.

use cascade_core::ComponentId;
use cascade_value::{Object, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// The run began.
    ExecutionStarted,
    /// Control entered a component.
    ComponentEnter,
    /// Control left a component.
    ComponentExit,
    /// A component began doing work (also written on resume).
    ComponentStarted,
    /// A component's work succeeded.
    ComponentCompleted,
    /// A component's work failed.
    ComponentFailed,
    /// A variable was written for the first time.
    VariableChanged,
    /// An existing variable was overwritten.
    VariableUpdated,
    /// A Decision condition was evaluated.
    DecisionEvaluated,
    /// A fork branch finished and its variables merged; entry order in
    /// the trail is the merge order, making an AND join reproducible.
    BranchCompleted,
    /// The run completed.
    ExecutionCompleted,
    /// A terminating error occurred.
    ErrorOccurred,
}

/// One record of the audit trail.
///
/// The `variables` field is a reference-shared snapshot: it holds the
/// persistent map of the moment the entry was written, so appending an
/// entry costs O(1) regardless of variable count. Serialization
/// materializes each snapshot in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// The component involved, absent for run-level entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<ComponentId>,
    /// What happened.
    pub action: AuditAction,
    /// Variables at the moment of the entry.
    pub variables: Object,
    /// A result value, where the action produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Human-readable detail.
    pub message: String,
}

impl AuditEntry {
    /// Create a run-level entry.
    #[must_use]
    pub fn execution(action: AuditAction, variables: Object, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            component_id: None,
            action,
            variables,
            result: None,
            message: message.into(),
        }
    }

    /// Create a component-level entry.
    #[must_use]
    pub fn component(
        action: AuditAction,
        component_id: ComponentId,
        variables: Object,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            component_id: Some(component_id),
            action,
            variables,
            result: None,
            message: message.into(),
        }
    }

    /// Attach a result value.
    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
