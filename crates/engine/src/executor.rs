//! The flow executor: run-to-completion loop, resume, cancellation.

use crate::fork::fork_section;
use crate::sandbox::SandboxPolicy;
use crate::service::HostServiceRegistry;
use crate::step::{StepEngine, StepOutcome};
use cascade_core::ExecutionId;
use cascade_eventbus::{CompositeExecutionObserver, ExecutionEvent, ExecutionObserver};
use cascade_execution::{
    AuditAction, AuditEntry, ErrorCode, ExecutionContext, ExecutionError, ExecutionMetrics,
    ExecutionResult, ExecutionStatus,
};
use cascade_flow::{ComponentType, Flow};
use cascade_limits::{LimitConfig, LimitError, ResourceLimiter};
use cascade_value::Object;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// How the executor is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// [`FlowExecutor::execute`] loops until a terminal state.
    #[default]
    RunToCompletion,
    /// The host drives [`FlowExecutor::execute_step`] itself,
    /// persisting the context between steps.
    SingleStep,
}

/// Executor configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Driving mode.
    pub mode: ExecutionMode,
    /// Run-loop iteration cap. Flows are expected to be acyclic; this
    /// guards against pathological inputs that slipped past
    /// validation.
    pub max_iterations: u64,
    /// Resource quotas for every run.
    pub limits: LimitConfig,
    /// Capability gate for host services.
    pub sandbox: SandboxPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::RunToCompletion,
            max_iterations: 10_000,
            limits: LimitConfig::default(),
            sandbox: SandboxPolicy::default(),
        }
    }
}

/// Executes flows against a host service registry.
///
/// Owns the per-executor collaborators the design keeps out of global
/// state: the [`ResourceLimiter`], the observer composite, and the
/// service registry. One executor can run many flows, concurrently.
#[derive(Debug, Clone)]
pub struct FlowExecutor {
    pub(crate) engine: StepEngine,
    pub(crate) config: ExecutorConfig,
}

impl FlowExecutor {
    /// Create an executor. Fails only on an invalid limit
    /// configuration.
    pub fn new(
        config: ExecutorConfig,
        services: HostServiceRegistry,
        observers: CompositeExecutionObserver,
    ) -> Result<Self, LimitError> {
        let limiter = Arc::new(ResourceLimiter::new(config.limits.clone())?);
        let engine = StepEngine::new(
            Arc::new(services),
            Arc::new(observers),
            limiter,
            config.sandbox.clone(),
        );
        Ok(Self { engine, config })
    }

    /// The step engine, for hosts that drive single steps.
    #[must_use]
    pub fn engine(&self) -> &StepEngine {
        &self.engine
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a flow to completion with a fresh context.
    pub async fn execute(&self, flow: &Arc<Flow>, initial_variables: Object) -> ExecutionResult {
        self.execute_with_cancellation(flow, initial_variables, CancellationToken::new())
            .await
            .0
    }

    /// Run a flow to completion under a caller-held cancellation
    /// token, returning the terminal context alongside the result (the
    /// context carries the audit trail).
    pub async fn execute_with_cancellation(
        &self,
        flow: &Arc<Flow>,
        initial_variables: Object,
        cancellation: CancellationToken,
    ) -> (ExecutionResult, ExecutionContext) {
        let execution_id = ExecutionId::v4();
        let context = ExecutionContext::new(flow.id.clone(), execution_id)
            .with_variables(&initial_variables)
            .with_status(ExecutionStatus::Running)
            .with_current_component(Some(flow.start().id.clone()));

        if let Err(error) = check_executable(flow) {
            return (
                ExecutionResult::failure(error, ExecutionMetrics::default()),
                context.with_status(ExecutionStatus::Failed),
            );
        }
        if let Err(err) = self.engine.limiter.start_execution(execution_id) {
            let error = ExecutionError::from(err);
            return (
                ExecutionResult::failure(error.clone(), ExecutionMetrics::default()),
                context.with_status(ExecutionStatus::Failed),
            );
        }

        let started = Instant::now();
        self.engine.emit(&ExecutionEvent::ExecutionStarted { execution_id });
        let opening = AuditEntry::execution(
            AuditAction::ExecutionStarted,
            context.variables.clone(),
            format!("Starting execution of flow {}", flow.id),
        );
        let context = context.with_audit(opening);
        let _ = self.engine.limiter.record_audit_entry(execution_id);

        let outcome = self.run_loop(flow, context, &cancellation).await;
        self.conclude(execution_id, started, outcome)
    }

    /// Validate that a persisted context can continue this flow.
    ///
    /// Refused (`CANNOT_RESUME`) when the context belongs to a
    /// different flow, names a component the flow no longer has, or is
    /// already terminal.
    pub fn can_resume(&self, flow: &Flow, context: &ExecutionContext) -> Result<(), ExecutionError> {
        if context.flow_id != flow.id {
            return Err(ExecutionError::new(
                ErrorCode::CannotResume,
                format!(
                    "context belongs to flow {}, not {}",
                    context.flow_id, flow.id
                ),
            ));
        }
        let Some(current) = &context.current_component_id else {
            return Err(ExecutionError::new(
                ErrorCode::CannotResume,
                "context has no current component",
            ));
        };
        if flow.component(current).is_none() {
            return Err(ExecutionError::new(
                ErrorCode::CannotResume,
                format!("component {current} no longer exists in flow {}", flow.id),
            ));
        }
        if context.is_terminal() || context.status == ExecutionStatus::NotStarted {
            return Err(ExecutionError::new(
                ErrorCode::CannotResume,
                format!("cannot resume a {} execution", context.status),
            ));
        }
        Ok(())
    }

    /// Continue a persisted, unfinished context to completion.
    pub async fn resume(
        &self,
        flow: &Arc<Flow>,
        context: ExecutionContext,
        cancellation: CancellationToken,
    ) -> (ExecutionResult, ExecutionContext) {
        if let Err(error) = check_executable(flow).and_then(|()| self.can_resume(flow, &context)) {
            return (
                ExecutionResult::failure(error, ExecutionMetrics::default()),
                context,
            );
        }

        let execution_id = context.execution_id;
        if let Err(err) = self.engine.limiter.start_execution(execution_id) {
            let error = ExecutionError::from(err);
            return (
                ExecutionResult::failure(error, ExecutionMetrics::default()),
                context,
            );
        }

        let started = Instant::now();
        let current = context
            .current_component_id
            .clone()
            .unwrap_or_else(|| flow.start().id.clone());
        let resuming = AuditEntry::component(
            AuditAction::ComponentStarted,
            current,
            context.variables.clone(),
            "Resuming execution",
        );
        let context = context
            .with_status(ExecutionStatus::Running)
            .with_audit(resuming);
        let _ = self.engine.limiter.record_audit_entry(execution_id);

        let outcome = self.run_loop(flow, context, &cancellation).await;
        self.conclude(execution_id, started, outcome)
    }

    /// Prepare a context for single-step driving: mint an execution
    /// id, register the run with the limiter, and position the context
    /// at the Start component. Pair with [`FlowExecutor::release`]
    /// when the host is done stepping.
    pub fn begin(
        &self,
        flow: &Flow,
        initial_variables: Object,
    ) -> Result<ExecutionContext, ExecutionError> {
        check_executable(flow)?;
        let execution_id = ExecutionId::v4();
        self.engine.limiter.start_execution(execution_id)?;
        self.engine.emit(&ExecutionEvent::ExecutionStarted { execution_id });

        let context = ExecutionContext::new(flow.id.clone(), execution_id)
            .with_variables(&initial_variables)
            .with_status(ExecutionStatus::Running)
            .with_current_component(Some(flow.start().id.clone()));
        let opening = AuditEntry::execution(
            AuditAction::ExecutionStarted,
            context.variables.clone(),
            format!("Starting execution of flow {}", flow.id),
        );
        let _ = self.engine.limiter.record_audit_entry(execution_id);
        Ok(context.with_audit(opening))
    }

    /// Drop limiter state for a run driven through
    /// [`FlowExecutor::execute_step`]. Also required before resuming
    /// such a run in the same process.
    pub fn release(&self, execution_id: ExecutionId) {
        let _ = self.engine.limiter.end_execution(execution_id);
    }

    /// Advance a context by one step (the `SingleStep` surface). Fork
    /// sections run as a unit: stepping onto a Fork coordinates the
    /// whole section and leaves the context at the Join.
    pub async fn execute_step(
        &self,
        flow: &Arc<Flow>,
        context: ExecutionContext,
        cancellation: &CancellationToken,
    ) -> Result<StepOutcome, ExecutionError> {
        let current = context.current_component_id.clone().ok_or_else(|| {
            ExecutionError::new(
                ErrorCode::ExecutionException,
                "cannot step: context has no current component",
            )
        })?;
        let component = flow.component(&current).ok_or_else(|| {
            ExecutionError::new(
                ErrorCode::InvalidSuccessor,
                format!("component {current} does not exist in flow {}", flow.id),
            )
            .at(current.clone())
        })?;

        if component.component_type == ComponentType::Fork {
            let context = fork_section(
                self.engine.clone(),
                Arc::clone(flow),
                current,
                context,
                cancellation.clone(),
                self.config.max_iterations,
            )
            .await?;
            return Ok(StepOutcome {
                context,
                complete: false,
                outputs: Object::new(),
            });
        }

        self.engine.step(flow, &context, cancellation).await
    }

    async fn run_loop(
        &self,
        flow: &Arc<Flow>,
        mut context: ExecutionContext,
        cancellation: &CancellationToken,
    ) -> Result<(ExecutionContext, Object), (ExecutionError, ExecutionContext)> {
        let mut iterations = 0u64;

        loop {
            if cancellation.is_cancelled() {
                return Err((ExecutionError::cancelled(), context));
            }
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err((
                    ExecutionError::new(
                        ErrorCode::MaxIterationsExceeded,
                        format!(
                            "execution exceeded {} iterations; flow is cyclic or pathological",
                            self.config.max_iterations
                        ),
                    ),
                    context,
                ));
            }
            if let Err(limit) = self.engine.limiter.check_all(context.execution_id) {
                return Err((limit.into(), context));
            }

            let snapshot = context.clone();
            let outcome = match self.execute_step(flow, context, cancellation).await {
                Ok(outcome) => outcome,
                Err(error) => return Err((error, snapshot)),
            };
            if outcome.complete {
                let closing = AuditEntry::execution(
                    AuditAction::ExecutionCompleted,
                    outcome.context.variables.clone(),
                    "Execution completed",
                );
                let final_context = outcome.context.with_audit(closing);
                let _ = self
                    .engine
                    .limiter
                    .record_audit_entry(final_context.execution_id);
                return Ok((final_context, outcome.outputs));
            }
            context = outcome.context;
        }
    }

    /// Terminal bookkeeping shared by every exit path: one terminal
    /// event, one terminal audit entry, metrics from the limiter, and
    /// limiter state cleanup.
    fn conclude(
        &self,
        execution_id: ExecutionId,
        started: Instant,
        outcome: Result<(ExecutionContext, Object), (ExecutionError, ExecutionContext)>,
    ) -> (ExecutionResult, ExecutionContext) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let usage = self.engine.limiter.end_execution(execution_id).ok();
        let metrics = ExecutionMetrics {
            duration_ms,
            steps: usage.as_ref().map_or(0, |u| u.steps),
            peak_context_bytes: usage.as_ref().map_or(0, |u| u.peak_context_bytes),
            audit_entries: usage.as_ref().map_or(0, |u| u.audit_entries),
        };

        match outcome {
            Ok((context, outputs)) => {
                self.engine.emit(&ExecutionEvent::ExecutionCompleted {
                    execution_id,
                    duration_ms,
                });
                tracing::info!(%execution_id, duration_ms, "execution completed");
                (ExecutionResult::success(outputs, metrics), context)
            }
            Err((error, context)) => {
                // Cancellation is an abort, not a failure of the flow
                // itself; everything else emits ExecutionFailed once.
                if error.code == ErrorCode::Cancelled {
                    self.engine.emit(&ExecutionEvent::ExecutionAborted {
                        execution_id,
                        reason: error.message.clone(),
                        duration_ms,
                    });
                } else {
                    self.engine.emit(&ExecutionEvent::ExecutionFailed {
                        execution_id,
                        error: error.clone(),
                        duration_ms,
                    });
                }
                tracing::warn!(%execution_id, %error, duration_ms, "execution did not complete");

                let status = if error.code == ErrorCode::Cancelled {
                    ExecutionStatus::Cancelled
                } else {
                    ExecutionStatus::Failed
                };
                let entry = AuditEntry::execution(
                    AuditAction::ErrorOccurred,
                    context.variables.clone(),
                    error.to_string(),
                );
                let failed_context = context.with_status(status).with_audit(entry);
                (ExecutionResult::failure(error, metrics), failed_context)
            }
        }
    }
}

/// Refuse flows that carry component types without runtime semantics.
/// Recognizing them in the graph model is deliberate; silently
/// skipping them at runtime is not.
fn check_executable(flow: &Flow) -> Result<(), ExecutionError> {
    for component in &flow.components {
        if !component.component_type.is_executable() {
            return Err(ExecutionError::new(
                ErrorCode::UnsupportedComponentType,
                format!(
                    "flow {} contains a {} component ({}), which has no runtime semantics",
                    flow.id, component.component_type, component.id
                ),
            )
            .at(component.id.clone()));
        }
    }
    Ok(())
}

/// Convenience builder for the common "config + services + observers"
/// assembly.
#[derive(Default)]
pub struct FlowExecutorBuilder {
    config: ExecutorConfig,
    services: HostServiceRegistry,
    observers: CompositeExecutionObserver,
}

impl FlowExecutorBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a host service.
    #[must_use]
    pub fn service(
        mut self,
        name: impl Into<String>,
        service: Arc<dyn crate::service::HostService>,
    ) -> Self {
        self.services.register(name, service);
        self
    }

    /// Register an observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observers.register(observer);
        self
    }

    /// Build the executor.
    pub fn build(self) -> Result<FlowExecutor, LimitError> {
        FlowExecutor::new(self.config, self.services, self.observers)
    }
}
