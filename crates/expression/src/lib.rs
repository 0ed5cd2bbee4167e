#![forbid(unsafe_code)]

//! # Cascade Expression
//!
//! The expression language used by Decision conditions and Action
//! parameters: dotted variable references (`user.name`,
//! `data.items[0]`), literals, arithmetic, comparison, logical
//! operators, and parentheses. Deliberately minimal: a hand-written
//! lexer and precedence-climbing parser keep the surface sandboxable.
//!
//! Evaluation is **pure**: no I/O, no side effects, no clock. Undefined
//! references evaluate to [`Value::Null`]; there is no type coercion;
//! mixing types in arithmetic, ordering, or logic is an error rather
//! than a guess.
//!
//! ```
//! use cascade_expression::ExpressionEngine;
//! use cascade_value::{Object, Value};
//!
//! let engine = ExpressionEngine::new();
//! let vars = Object::new().insert("x", Value::number(2.0));
//! let result = engine.evaluate("x > 1", &vars).unwrap();
//! assert_eq!(result, Value::boolean(true));
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod sanitizer;
pub mod token;

pub use ast::{BinaryOp, Expr};
pub use error::ExpressionError;
pub use sanitizer::ExpressionSanitizer;

use cascade_value::{Object, Value};

/// Result alias for expression operations.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Parse-and-evaluate facade.
#[derive(Debug, Default, Clone)]
pub struct ExpressionEngine {}

impl ExpressionEngine {
    /// Create an engine.
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }

    /// Parse an expression to its AST without evaluating.
    pub fn parse(&self, source: &str) -> ExpressionResult<Expr> {
        let tokens = lexer::Lexer::new(source).tokenize()?;
        parser::Parser::new(tokens).parse()
    }

    /// Evaluate an expression against a variable scope.
    pub fn evaluate(&self, source: &str, variables: &Object) -> ExpressionResult<Value> {
        let expr = self.parse(source)?;
        eval::evaluate(&expr, variables)
    }
}
