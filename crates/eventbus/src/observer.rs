//! Observers and the composite fan-out.

use crate::event::ExecutionEvent;
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Receives execution events.
///
/// Implementations must tolerate concurrent invocation: fork branch
/// tasks emit without synchronization. Observers receive snapshots and
/// must not attempt to influence the run.
pub trait ExecutionObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &ExecutionEvent);
}

/// Fans events out to registered observers in registration order.
///
/// A panic from one observer is caught, logged at `warn`, and does not
/// reach the engine or the observers registered after it.
#[derive(Default, Clone)]
pub struct CompositeExecutionObserver {
    observers: Vec<Arc<dyn ExecutionObserver>>,
}

impl std::fmt::Debug for CompositeExecutionObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeExecutionObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CompositeExecutionObserver {
    /// Create an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Order of registration is order of
    /// delivery.
    pub fn register(&mut self, observer: Arc<dyn ExecutionObserver>) {
        self.observers.push(observer);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` with no observers registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver an event to every observer.
    pub fn emit(&self, event: &ExecutionEvent) {
        for observer in &self.observers {
            if catch_unwind(AssertUnwindSafe(|| observer.on_event(event))).is_err() {
                tracing::warn!(
                    execution_id = %event.execution_id(),
                    "observer panicked; skipping it for this event"
                );
            }
        }
    }
}

/// Observer that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExecutionObserver for TracingObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::ExecutionFailed { error, .. } => {
                tracing::warn!(execution_id = %event.execution_id(), %error, "execution failed");
            }
            ExecutionEvent::ExecutionAborted { reason, .. } => {
                tracing::warn!(execution_id = %event.execution_id(), reason, "execution aborted");
            }
            other => {
                tracing::debug!(execution_id = %other.execution_id(), event = ?other, "execution event");
            }
        }
    }
}

/// Observer that collects every event it sees. Intended for tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl CollectingObserver {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the events collected so far.
    #[must_use]
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().clone()
    }

    /// Count events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&ExecutionEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl ExecutionObserver for CollectingObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        self.events.lock().push(event.clone());
    }
}
