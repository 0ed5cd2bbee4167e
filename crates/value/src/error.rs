//! Value access errors.

use crate::value::ValueKind;
use thiserror::Error;

/// Errors produced when inspecting or converting values.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    /// A key lookup on an object found nothing.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A value had a different kind than the operation requires.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        /// The kind the operation requires.
        expected: ValueKind,
        /// The kind actually present.
        actual: ValueKind,
    },

    /// A property held a deferred expression where a literal was required.
    #[error("property is a deferred expression, not a literal")]
    DeferredExpression,
}
