//! The immutable execution context.

use crate::audit::AuditEntry;
use crate::stack::StackFrame;
use crate::status::ExecutionStatus;
use cascade_core::{ComponentId, ExecutionId, FlowId};
use cascade_value::{Object, Value};
use im::Vector;
use serde::{Deserialize, Serialize};

/// An immutable snapshot of an execution.
///
/// Every mutating operation returns a new context; the unchanged
/// sub-structures (variable map, stack, audit trail) are shared with
/// the predecessor through their persistent backing trees. Snapshotting
/// a context is therefore a pointer copy, which is what makes the audit
/// trail's per-entry variable snapshots affordable.
///
/// A no-op variable write is detected up front and returns a context
/// whose variable map is [`ptr_eq`](Object::ptr_eq) to the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// The flow being executed.
    pub flow_id: FlowId,
    /// This run's identifier. Fork branches share the parent's.
    pub execution_id: ExecutionId,
    /// The component the next step will dispatch; `None` before start
    /// and after completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_component_id: Option<ComponentId>,
    /// Execution variables.
    pub variables: Object,
    /// The component call stack.
    pub execution_stack: Vector<StackFrame>,
    /// The append-only audit trail.
    pub audit_trail: Vector<AuditEntry>,
    /// Free-form run metadata.
    pub metadata: Object,
    /// Run-level status.
    pub status: ExecutionStatus,
}

impl ExecutionContext {
    /// Create a fresh context for a run.
    #[must_use]
    pub fn new(flow_id: FlowId, execution_id: ExecutionId) -> Self {
        Self {
            flow_id,
            execution_id,
            current_component_id: None,
            variables: Object::new(),
            execution_stack: Vector::new(),
            audit_trail: Vector::new(),
            metadata: Object::new(),
            status: ExecutionStatus::NotStarted,
        }
    }

    /// Replace the run status.
    #[must_use]
    pub fn with_status(&self, status: ExecutionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Point the context at a component (or clear it with `None`).
    #[must_use]
    pub fn with_current_component(&self, component_id: Option<ComponentId>) -> Self {
        Self {
            current_component_id: component_id,
            ..self.clone()
        }
    }

    /// Write a variable.
    ///
    /// Writing a value equal to the existing one is a no-op: the result
    /// shares its variable map with `self` by identity, so downstream
    /// size accounting and change detection can skip it.
    #[must_use]
    pub fn with_variable(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if self.variables.get(&name) == Some(&value) {
            return self.clone();
        }
        Self {
            variables: self.variables.insert(name, value),
            ..self.clone()
        }
    }

    /// Merge a whole object of variables, last-writer-wins.
    #[must_use]
    pub fn with_variables(&self, incoming: &Object) -> Self {
        if incoming.is_empty() {
            return self.clone();
        }
        Self {
            variables: self.variables.merge(incoming),
            ..self.clone()
        }
    }

    /// Replace the variable map outright. Used by join coordination,
    /// which computes the merged map itself.
    #[must_use]
    pub fn with_variable_map(&self, variables: Object) -> Self {
        Self {
            variables,
            ..self.clone()
        }
    }

    /// Push a stack frame.
    #[must_use]
    pub fn push_frame(&self, frame: StackFrame) -> Self {
        let mut stack = self.execution_stack.clone();
        stack.push_back(frame);
        Self {
            execution_stack: stack,
            ..self.clone()
        }
    }

    /// Pop the top stack frame, returning the new context and the
    /// closed frame. A pop on an empty stack is a no-op.
    #[must_use]
    pub fn pop_frame(&self) -> (Self, Option<StackFrame>) {
        let mut stack = self.execution_stack.clone();
        match stack.pop_back() {
            Some(frame) => {
                let closed = frame.exited();
                (
                    Self {
                        execution_stack: stack,
                        ..self.clone()
                    },
                    Some(closed),
                )
            }
            None => (self.clone(), None),
        }
    }

    /// Append an audit entry.
    #[must_use]
    pub fn with_audit(&self, entry: AuditEntry) -> Self {
        let mut trail = self.audit_trail.clone();
        trail.push_back(entry);
        Self {
            audit_trail: trail,
            ..self.clone()
        }
    }

    /// Append a whole audit tail, preserving its order. Used when a
    /// fork branch's history is folded back into the parent trail.
    #[must_use]
    pub fn with_audit_tail(&self, tail: &Vector<AuditEntry>) -> Self {
        if tail.is_empty() {
            return self.clone();
        }
        let mut trail = self.audit_trail.clone();
        trail.append(tail.clone());
        Self {
            audit_trail: trail,
            ..self.clone()
        }
    }

    /// Fork a child context for a branch task: same run identity and
    /// variables (shared copy-on-write), empty audit tail so the branch
    /// records only its own history, starting at the given component.
    #[must_use]
    pub fn fork_branch(&self, entry_component: ComponentId) -> Self {
        Self {
            flow_id: self.flow_id.clone(),
            execution_id: self.execution_id,
            current_component_id: Some(entry_component),
            variables: self.variables.clone(),
            execution_stack: self.execution_stack.clone(),
            audit_trail: Vector::new(),
            metadata: self.metadata.clone(),
            status: ExecutionStatus::Running,
        }
    }

    /// Estimated byte weight of the context's variables, fed to the
    /// context-size quota.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        self.variables
            .entries()
            .map(|(k, v)| k.len() as u64 + v.estimated_size())
            .sum()
    }

    /// Returns `true` once the context can never advance again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
