//! Expression errors.

use thiserror::Error;

/// Errors from lexing, parsing, sanitizing, or evaluating an expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// The lexer met input it cannot tokenize.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The parser met an unexpected token or structure.
    #[error("parse error: {0}")]
    Parse(String),

    /// An operation was applied to operand types it does not accept.
    #[error("type error: {0}")]
    Type(String),

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Parser or evaluator recursion exceeded its depth cap.
    #[error("maximum expression depth ({0}) exceeded")]
    DepthExceeded(usize),

    /// The sanitizer rejected the expression before evaluation.
    #[error("expression rejected: contains forbidden fragment {0:?}")]
    Rejected(&'static str),
}

impl ExpressionError {
    /// Build a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    /// Build a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Build a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}
