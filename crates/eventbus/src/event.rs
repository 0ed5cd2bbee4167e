//! Execution events.

use cascade_core::{ComponentId, ExecutionId};
use cascade_execution::{ExecutionError, ResultStatus};
use cascade_value::{Object, Value};
use serde::{Deserialize, Serialize};

/// An event emitted by the engine as execution progresses.
///
/// Observers receive snapshots; nothing reachable from an event can
/// mutate the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// The run began.
    ExecutionStarted {
        /// The run.
        execution_id: ExecutionId,
    },

    /// Control entered a component.
    ComponentEnter {
        /// The run.
        execution_id: ExecutionId,
        /// The component entered.
        component_id: ComponentId,
    },

    /// Control left a component.
    ComponentExit {
        /// The run.
        execution_id: ExecutionId,
        /// The component left.
        component_id: ComponentId,
        /// How the component's dispatch ended.
        result: ResultStatus,
        /// Wall-clock time spent in the component.
        duration_ms: u64,
    },

    /// The context's variables changed.
    ContextChanged {
        /// The run.
        execution_id: ExecutionId,
        /// Variables before the change. A cheap persistent snapshot.
        before: Object,
        /// Variables after the change.
        after: Object,
        /// Why the change happened (e.g. which write).
        reason: String,
    },

    /// A Decision condition was evaluated.
    DecisionEvaluated {
        /// The run.
        execution_id: ExecutionId,
        /// The Decision component.
        component_id: ComponentId,
        /// The condition source.
        condition: String,
        /// The boolean outcome.
        result: bool,
    },

    /// The run completed successfully.
    ExecutionCompleted {
        /// The run.
        execution_id: ExecutionId,
        /// Total run duration.
        duration_ms: u64,
    },

    /// The run terminated with an error.
    ExecutionFailed {
        /// The run.
        execution_id: ExecutionId,
        /// The terminating error.
        error: ExecutionError,
        /// Total run duration.
        duration_ms: u64,
    },

    /// The run was stopped before reaching a terminal component.
    ExecutionAborted {
        /// The run.
        execution_id: ExecutionId,
        /// Why it was stopped.
        reason: String,
        /// Total run duration.
        duration_ms: u64,
    },
}

impl ExecutionEvent {
    /// The run this event belongs to.
    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            Self::ExecutionStarted { execution_id }
            | Self::ComponentEnter { execution_id, .. }
            | Self::ComponentExit { execution_id, .. }
            | Self::ContextChanged { execution_id, .. }
            | Self::DecisionEvaluated { execution_id, .. }
            | Self::ExecutionCompleted { execution_id, .. }
            | Self::ExecutionFailed { execution_id, .. }
            | Self::ExecutionAborted { execution_id, .. } => *execution_id,
        }
    }

    /// The component this event concerns, if any.
    #[must_use]
    pub fn component_id(&self) -> Option<&ComponentId> {
        match self {
            Self::ComponentEnter { component_id, .. }
            | Self::ComponentExit { component_id, .. }
            | Self::DecisionEvaluated { component_id, .. } => Some(component_id),
            _ => None,
        }
    }

    /// Returns `true` for the three run-ending events.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionCompleted { .. }
                | Self::ExecutionFailed { .. }
                | Self::ExecutionAborted { .. }
        )
    }

    /// A decision's result value, for `DecisionEvaluated` events.
    #[must_use]
    pub fn decision_result(&self) -> Option<Value> {
        match self {
            Self::DecisionEvaluated { result, .. } => Some(Value::boolean(*result)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn execution_id_accessor_covers_all_variants() {
        let id = ExecutionId::v4();
        let events = [
            ExecutionEvent::ExecutionStarted { execution_id: id },
            ExecutionEvent::ComponentEnter {
                execution_id: id,
                component_id: ComponentId::new("a"),
            },
            ExecutionEvent::ExecutionCompleted {
                execution_id: id,
                duration_ms: 5,
            },
        ];
        for event in &events {
            assert_eq!(event.execution_id(), id);
        }
    }

    #[test]
    fn component_id_only_on_component_events() {
        let id = ExecutionId::v4();
        let enter = ExecutionEvent::ComponentEnter {
            execution_id: id,
            component_id: ComponentId::new("a"),
        };
        assert_eq!(enter.component_id(), Some(&ComponentId::new("a")));

        let started = ExecutionEvent::ExecutionStarted { execution_id: id };
        assert!(started.component_id().is_none());
    }

    #[test]
    fn terminal_events() {
        let id = ExecutionId::v4();
        assert!(
            ExecutionEvent::ExecutionCompleted {
                execution_id: id,
                duration_ms: 1
            }
            .is_terminal()
        );
        assert!(
            ExecutionEvent::ExecutionAborted {
                execution_id: id,
                reason: "drop".into(),
                duration_ms: 1
            }
            .is_terminal()
        );
        assert!(!ExecutionEvent::ExecutionStarted { execution_id: id }.is_terminal());
    }

    #[test]
    fn serde_tagging() {
        let event = ExecutionEvent::ComponentExit {
            execution_id: ExecutionId::v4(),
            component_id: ComponentId::new("a"),
            result: ResultStatus::Success,
            duration_ms: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "component_exit");
        let back: ExecutionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
