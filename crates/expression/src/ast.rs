//! Expression AST.

use cascade_value::Value;
use std::sync::Arc;

/// A parsed expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value.
    Literal(Value),
    /// Root variable reference.
    Variable(Arc<str>),
    /// `object.property`
    PropertyAccess {
        /// The expression being accessed.
        object: Box<Expr>,
        /// The property name.
        property: Arc<str>,
    },
    /// `object[index]`
    IndexAccess {
        /// The expression being indexed.
        object: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
    },
    /// `-expr`
    Negate(Box<Expr>),
    /// `!expr`
    Not(Box<Expr>),
    /// `left op right`
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },
}

/// Binary operators, in the spec's operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`: numeric addition or string concatenation.
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// The operator's source form, for error messages.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}
