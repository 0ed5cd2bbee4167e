#![forbid(unsafe_code)]

//! # Cascade Engine
//!
//! The flow execution engine: walks a validated [`Flow`], maintains an
//! immutable-by-copy [`ExecutionContext`], dispatches each component to
//! its type-specific behavior, coordinates fork/join sections on
//! concurrent tasks, enforces per-execution quotas, and surfaces every
//! transition to observers.
//!
//! Layering, inside out: the dispatch module holds the per-type
//! "advance one component" semantics; [`step`] wraps one dispatch with
//! full bookkeeping (events, audit, stack frames, quotas) and the
//! panic boundary; [`executor`] owns the run-to-completion loop,
//! fork/join scheduling, cancellation, resume, and the streaming
//! surface.
//!
//! Host integration points: [`HostService`] / [`HostServiceRegistry`]
//! for Action components, [`SandboxPolicy`] for capability gating, and
//! any number of [`cascade_eventbus::ExecutionObserver`]s.
//!
//! [`Flow`]: cascade_flow::Flow
//! [`ExecutionContext`]: cascade_execution::ExecutionContext

mod dispatch;
pub mod executor;
mod fork;
pub mod sandbox;
pub mod service;
pub mod step;
pub mod stream;

pub use executor::{ExecutionMode, ExecutorConfig, FlowExecutor, FlowExecutorBuilder};
pub use sandbox::{FilesystemPolicy, NetworkPolicy, SandboxPolicy, ServiceCapabilities};
pub use service::{HostService, HostServiceRegistry, ServiceError};
pub use step::{StepEngine, StepOutcome};
pub use stream::EventStream;
