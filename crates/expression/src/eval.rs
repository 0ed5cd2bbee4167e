//! Tree-walking evaluator.
//!
//! Pure: reads the variable scope, touches nothing else. Path
//! navigation is lenient (a reference to something that is not there
//! yields `Null`) while operators are strict: no type coercion, ever.

use crate::ExpressionResult;
use crate::ast::{BinaryOp, Expr};
use crate::error::ExpressionError;
use cascade_value::{Object, Value};

/// Recursion cap for evaluation, matching the parser's.
const MAX_EVAL_DEPTH: usize = 128;

/// Evaluate an expression against a variable scope.
pub fn evaluate(expr: &Expr, variables: &Object) -> ExpressionResult<Value> {
    eval_with_depth(expr, variables, 0)
}

fn eval_with_depth(expr: &Expr, variables: &Object, depth: usize) -> ExpressionResult<Value> {
    if depth > MAX_EVAL_DEPTH {
        return Err(ExpressionError::DepthExceeded(MAX_EVAL_DEPTH));
    }

    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Variable(name) => Ok(variables.get(name).cloned().unwrap_or(Value::Null)),

        Expr::PropertyAccess { object, property } => {
            let object = eval_with_depth(object, variables, depth + 1)?;
            Ok(match object {
                Value::Object(map) => map.get(property).cloned().unwrap_or(Value::Null),
                // Navigating through an absent or mistyped value is an
                // undefined reference, not an error.
                _ => Value::Null,
            })
        }

        Expr::IndexAccess { object, index } => {
            let object = eval_with_depth(object, variables, depth + 1)?;
            let index = eval_with_depth(index, variables, depth + 1)?;
            match (&object, &index) {
                (Value::Array(items), Value::Number(n)) => {
                    if n.fract() != 0.0 || *n < 0.0 {
                        return Err(ExpressionError::type_error(format!(
                            "array index must be a non-negative integer, got {n}"
                        )));
                    }
                    Ok(items.get(*n as usize).cloned().unwrap_or(Value::Null))
                }
                (Value::Object(map), Value::String(key)) => {
                    Ok(map.get(key).cloned().unwrap_or(Value::Null))
                }
                (Value::Array(_) | Value::Object(_), other) => {
                    Err(ExpressionError::type_error(format!(
                        "invalid index type {}",
                        other.kind()
                    )))
                }
                _ => Ok(Value::Null),
            }
        }

        Expr::Negate(inner) => {
            let value = eval_with_depth(inner, variables, depth + 1)?;
            match value {
                Value::Number(n) => Ok(Value::number(-n)),
                other => Err(ExpressionError::type_error(format!(
                    "cannot negate {}",
                    other.kind()
                ))),
            }
        }

        Expr::Not(inner) => {
            let value = eval_with_depth(inner, variables, depth + 1)?;
            match value {
                Value::Boolean(b) => Ok(Value::boolean(!b)),
                other => Err(ExpressionError::type_error(format!(
                    "'!' requires a boolean, got {}",
                    other.kind()
                ))),
            }
        }

        Expr::Binary { left, op, right } => match op {
            // Logical operators short-circuit; both operands must be
            // booleans when evaluated.
            BinaryOp::And | BinaryOp::Or => {
                let lhs = expect_boolean(eval_with_depth(left, variables, depth + 1)?, op)?;
                let short_circuit = match op {
                    BinaryOp::And => !lhs,
                    _ => lhs,
                };
                if short_circuit {
                    return Ok(Value::boolean(lhs));
                }
                let rhs = expect_boolean(eval_with_depth(right, variables, depth + 1)?, op)?;
                Ok(Value::boolean(rhs))
            }
            _ => {
                let lhs = eval_with_depth(left, variables, depth + 1)?;
                let rhs = eval_with_depth(right, variables, depth + 1)?;
                eval_binary(*op, &lhs, &rhs)
            }
        },
    }
}

fn expect_boolean(value: Value, op: &BinaryOp) -> ExpressionResult<bool> {
    value.as_boolean().ok_or_else(|| {
        ExpressionError::type_error(format!(
            "'{}' requires boolean operands, got {}",
            op.symbol(),
            value.kind()
        ))
    })
}

fn eval_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> ExpressionResult<Value> {
    match op {
        // Structural equality across any tags; differing tags are
        // simply unequal.
        BinaryOp::Equal => Ok(Value::boolean(lhs == rhs)),
        BinaryOp::NotEqual => Ok(Value::boolean(lhs != rhs)),

        BinaryOp::LessThan | BinaryOp::GreaterThan | BinaryOp::LessEqual
        | BinaryOp::GreaterEqual => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::boolean(compare(op, a, b))),
            (Value::String(a), Value::String(b)) => {
                Ok(Value::boolean(compare(op, &a.as_ref(), &b.as_ref())))
            }
            _ => Err(type_mismatch(op, lhs, rhs)),
        },

        BinaryOp::Add => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::number(a + b)),
            (Value::String(a), Value::String(b)) => {
                Ok(Value::string(format!("{a}{b}")))
            }
            _ => Err(type_mismatch(op, lhs, rhs)),
        },

        BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => match op {
                BinaryOp::Subtract => Ok(Value::number(a - b)),
                BinaryOp::Multiply => Ok(Value::number(a * b)),
                _ => {
                    if *b == 0.0 {
                        Err(ExpressionError::DivisionByZero)
                    } else {
                        Ok(Value::number(a / b))
                    }
                }
            },
            _ => Err(type_mismatch(op, lhs, rhs)),
        },

        BinaryOp::And | BinaryOp::Or => unreachable!("handled with short-circuit"),
    }
}

fn compare<T: PartialOrd>(op: BinaryOp, a: &T, b: &T) -> bool {
    match op {
        BinaryOp::LessThan => a < b,
        BinaryOp::GreaterThan => a > b,
        BinaryOp::LessEqual => a <= b,
        _ => a >= b,
    }
}

fn type_mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> ExpressionError {
    ExpressionError::type_error(format!(
        "'{}' cannot combine {} and {}",
        op.symbol(),
        lhs.kind(),
        rhs.kind()
    ))
}
