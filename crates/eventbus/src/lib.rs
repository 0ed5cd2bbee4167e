#![forbid(unsafe_code)]

//! # Cascade Eventbus
//!
//! Execution event distribution. The engine emits an [`ExecutionEvent`]
//! at every significant transition; a [`CompositeExecutionObserver`]
//! fans each event out to registered observers in registration order.
//!
//! Observer failures are isolated: a panicking observer is logged and
//! skipped, and can never affect execution or the observers after it.
//! Events may arrive concurrently from fork branch tasks; observers
//! that keep state wrap it themselves.

pub mod event;
pub mod observer;

pub use event::ExecutionEvent;
pub use observer::{
    CollectingObserver, CompositeExecutionObserver, ExecutionObserver, TracingObserver,
};
