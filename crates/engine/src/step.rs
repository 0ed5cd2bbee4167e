//! The step engine: one component dispatch with full bookkeeping.

use crate::dispatch;
use crate::sandbox::SandboxPolicy;
use crate::service::HostServiceRegistry;
use cascade_eventbus::{CompositeExecutionObserver, ExecutionEvent};
use cascade_execution::{
    AuditAction, AuditEntry, ErrorCode, ExecutionContext, ExecutionError, ResultStatus, StackFrame,
};
use cascade_expression::{ExpressionEngine, ExpressionSanitizer};
use cascade_flow::Flow;
use cascade_limits::ResourceLimiter;
use cascade_value::{Object, Value};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The result of one step.
#[derive(Debug)]
pub struct StepOutcome {
    /// The context after the step; `current_component_id` points at the
    /// next component, or is `None` after completion.
    pub context: ExecutionContext,
    /// True when the stepped component was an End.
    pub complete: bool,
    /// Output variables, non-empty only when `complete`.
    pub outputs: Object,
}

/// Executes single steps: resolve the current component, run its
/// dispatch, and record everything (events, audit, stack frames,
/// quotas). Any panic escaping a dispatcher is converted to
/// `EXECUTION_EXCEPTION` here.
///
/// Cheap to clone; branch tasks each hold one.
#[derive(Debug, Clone)]
pub struct StepEngine {
    pub(crate) services: Arc<HostServiceRegistry>,
    pub(crate) observers: Arc<CompositeExecutionObserver>,
    pub(crate) limiter: Arc<ResourceLimiter>,
    pub(crate) expressions: ExpressionEngine,
    pub(crate) sanitizer: ExpressionSanitizer,
    pub(crate) sandbox: SandboxPolicy,
}

impl StepEngine {
    /// Create a step engine.
    #[must_use]
    pub fn new(
        services: Arc<HostServiceRegistry>,
        observers: Arc<CompositeExecutionObserver>,
        limiter: Arc<ResourceLimiter>,
        sandbox: SandboxPolicy,
    ) -> Self {
        Self {
            services,
            observers,
            limiter,
            expressions: ExpressionEngine::new(),
            sanitizer: ExpressionSanitizer::new(),
            sandbox,
        }
    }

    /// Advance the current component, returning the next context.
    ///
    /// Responsibilities, in order: resolve `current_component_id`, emit
    /// `ComponentEnter`, charge one step to the quota, push a stack
    /// frame, dispatch by type behind a panic boundary, pop the frame,
    /// emit `ComponentExit` with the wall-clock duration, and charge
    /// the resulting context size.
    pub async fn step(
        &self,
        flow: &Flow,
        context: &ExecutionContext,
        cancellation: &CancellationToken,
    ) -> Result<StepOutcome, ExecutionError> {
        let component_id = context.current_component_id.clone().ok_or_else(|| {
            ExecutionError::new(
                ErrorCode::ExecutionException,
                "cannot step: context has no current component",
            )
        })?;
        let component = flow.component(&component_id).cloned().ok_or_else(|| {
            ExecutionError::new(
                ErrorCode::InvalidSuccessor,
                format!("component {component_id} does not exist in flow {}", flow.id),
            )
            .at(component_id.clone())
        })?;

        tracing::debug!(
            execution_id = %context.execution_id,
            component_id = %component_id,
            component_type = %component.component_type,
            "stepping component"
        );

        self.emit(&ExecutionEvent::ComponentEnter {
            execution_id: context.execution_id,
            component_id: component_id.clone(),
        });
        self.limiter.record_step(context.execution_id)?;

        let enter = AuditEntry::component(
            AuditAction::ComponentEnter,
            component_id.clone(),
            context.variables.clone(),
            "",
        );
        let ctx = self
            .audit(context.clone(), enter)?
            .push_frame(StackFrame::enter(
                component_id.clone(),
                component.component_type,
            ));

        let started = Instant::now();
        let dispatched =
            AssertUnwindSafe(dispatch::advance(self, flow, &component, &ctx, cancellation))
                .catch_unwind()
                .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let advanced = match dispatched {
            Ok(result) => result,
            Err(panic) => Err(ExecutionError::new(
                ErrorCode::ExecutionException,
                format!("component dispatch panicked: {}", panic_message(&panic)),
            )
            .at(component_id.clone())),
        };

        match advanced {
            Ok(advance) => {
                let (ctx, _closed) = advance.context.pop_frame();
                self.emit(&ExecutionEvent::ComponentExit {
                    execution_id: ctx.execution_id,
                    component_id: component_id.clone(),
                    result: advance.result,
                    duration_ms,
                });
                let exit = AuditEntry::component(
                    AuditAction::ComponentExit,
                    component_id,
                    ctx.variables.clone(),
                    "",
                );
                let ctx = self.audit(ctx, exit)?;
                self.limiter
                    .record_context_size(ctx.execution_id, ctx.estimated_size())?;

                Ok(StepOutcome {
                    context: ctx,
                    complete: advance.complete,
                    outputs: advance.outputs,
                })
            }
            Err(error) => {
                self.emit(&ExecutionEvent::ComponentExit {
                    execution_id: context.execution_id,
                    component_id,
                    result: ResultStatus::Failure,
                    duration_ms,
                });
                Err(error)
            }
        }
    }

    /// Fan an event out to the observers.
    pub(crate) fn emit(&self, event: &ExecutionEvent) {
        self.observers.emit(event);
    }

    /// Append an audit entry, charging the audit quota.
    pub(crate) fn audit(
        &self,
        context: ExecutionContext,
        entry: AuditEntry,
    ) -> Result<ExecutionContext, ExecutionError> {
        self.limiter.record_audit_entry(context.execution_id)?;
        Ok(context.with_audit(entry))
    }

    /// Sanitize and evaluate an expression against the variables.
    pub(crate) fn evaluate(
        &self,
        source: &str,
        variables: &Object,
    ) -> Result<Value, ExecutionError> {
        let checked = self
            .sanitizer
            .check(source)
            .map_err(|e| ExecutionError::new(ErrorCode::ExpressionError, e.to_string()))?;
        self.expressions
            .evaluate(checked, variables)
            .map_err(|e| ExecutionError::new(ErrorCode::ExpressionError, e.to_string()))
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
