#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Cascade Execution
//!
//! Execution-time state for the Cascade flow engine: everything that
//! persists, resumes, and audits. This crate models state; the engine
//! orchestrator that drives it lives in `cascade-engine`.
//!
//! - [`ExecutionContext`] — immutable snapshot of a run. Every update
//!   returns a new context sharing unchanged sub-structures with its
//!   predecessor.
//! - [`ExecutionStatus`] — the run-level state machine.
//! - [`StackFrame`] — the component call stack.
//! - [`AuditEntry`] / [`AuditAction`] — the append-only audit trail.
//! - [`ExecutionResult`] / [`ExecutionMetrics`] — terminal outcome.
//! - [`ExecutionError`] / [`ErrorCode`] — the engine's error surface.

pub mod audit;
pub mod context;
pub mod error;
pub mod result;
pub mod stack;
pub mod status;

pub use audit::{AuditAction, AuditEntry};
pub use context::ExecutionContext;
pub use error::{ErrorCode, ExecutionError};
pub use result::{ExecutionMetrics, ExecutionResult, ResultStatus};
pub use stack::StackFrame;
pub use status::ExecutionStatus;
