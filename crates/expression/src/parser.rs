//! Parser: precedence climbing over the token stream.

use crate::ExpressionResult;
use crate::ast::{BinaryOp, Expr};
use crate::error::ExpressionError;
use crate::token::{Span, Token, TokenKind};
use cascade_value::Value;
use std::sync::Arc;

/// Recursion cap. Expressions here are flow conditions and parameter
/// templates, not programs; anything near this depth is hostile input.
const MAX_PARSER_DEPTH: usize = 128;

const EOF_TOKEN: Token<'static> = Token {
    kind: TokenKind::Eof,
    span: Span { start: 0, end: 0 },
};

/// Parser over a token list.
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser.
    #[must_use]
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> ExpressionResult<Expr> {
        let expr = self.parse_binary(0, 0)?;
        match &self.current().kind {
            TokenKind::Eof => Ok(expr),
            other => Err(ExpressionError::parse(format!(
                "unexpected token '{other}' after expression"
            ))),
        }
    }

    fn parse_binary(&mut self, min_precedence: u8, depth: usize) -> ExpressionResult<Expr> {
        if depth > MAX_PARSER_DEPTH {
            return Err(ExpressionError::DepthExceeded(MAX_PARSER_DEPTH));
        }

        let mut left = self.parse_unary(depth + 1)?;

        while self.current().kind.is_binary_operator() {
            let precedence = self.current().kind.precedence();
            if precedence < min_precedence {
                break;
            }

            let op = match &self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                TokenKind::LessThan => BinaryOp::LessThan,
                TokenKind::GreaterThan => BinaryOp::GreaterThan,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                TokenKind::And => BinaryOp::And,
                TokenKind::Or => BinaryOp::Or,
                other => {
                    return Err(ExpressionError::parse(format!(
                        "unexpected operator '{other}'"
                    )));
                }
            };
            self.advance();

            // All operators here are left-associative.
            let right = self.parse_binary(precedence + 1, depth + 1)?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self, depth: usize) -> ExpressionResult<Expr> {
        if depth > MAX_PARSER_DEPTH {
            return Err(ExpressionError::DepthExceeded(MAX_PARSER_DEPTH));
        }
        match &self.current().kind {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::Negate(Box::new(self.parse_unary(depth + 1)?)))
            }
            TokenKind::Not => {
                self.advance();
                Ok(Expr::Not(Box::new(self.parse_unary(depth + 1)?)))
            }
            _ => self.parse_postfix(depth + 1),
        }
    }

    fn parse_postfix(&mut self, depth: usize) -> ExpressionResult<Expr> {
        let mut expr = self.parse_primary(depth + 1)?;

        loop {
            match &self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = match &self.current().kind {
                        TokenKind::Identifier(name) => *name,
                        _ => {
                            return Err(ExpressionError::parse(
                                "expected property name after '.'",
                            ));
                        }
                    };
                    self.advance();
                    expr = Expr::PropertyAccess {
                        object: Box::new(expr),
                        property: Arc::from(name),
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_binary(0, depth + 1)?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = Expr::IndexAccess {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self, depth: usize) -> ExpressionResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Value::string(&s)))
            }
            TokenKind::Boolean(b) => {
                self.advance();
                Ok(Expr::Literal(Value::boolean(b)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Variable(Arc::from(name)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_binary(0, depth + 1)?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            other => Err(ExpressionError::parse(format!(
                "unexpected token '{other}'"
            ))),
        }
    }

    fn current(&self) -> &Token<'a> {
        self.tokens.get(self.position).unwrap_or(&EOF_TOKEN)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn expect(&mut self, kind: &TokenKind<'_>) -> ExpressionResult<()> {
        if &self.current().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(ExpressionError::parse(format!(
                "expected '{kind}', found '{}'",
                self.current().kind
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> ExpressionResult<Expr> {
        Parser::new(Lexer::new(input).tokenize()?).parse()
    }

    #[test]
    fn literal() {
        assert_eq!(parse("42").unwrap(), Expr::Literal(Value::number(42.0)));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Value::Null));
    }

    #[test]
    fn precedence_multiplication_over_addition() {
        let expr = parse("1 + 2 * 3").unwrap();
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary")
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn left_associativity() {
        // 10 - 4 - 3 parses as (10 - 4) - 3
        let expr = parse("10 - 4 - 3").unwrap();
        let Expr::Binary { left, op, .. } = expr else {
            panic!("expected binary")
        };
        assert_eq!(op, BinaryOp::Subtract);
        assert!(matches!(
            *left,
            Expr::Binary {
                op: BinaryOp::Subtract,
                ..
            }
        ));
    }

    #[test]
    fn comparison_binds_tighter_than_logic() {
        let expr = parse("a > 1 && b < 2").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn dotted_path_and_index() {
        let expr = parse("data.items[0]").unwrap();
        let Expr::IndexAccess { object, index } = expr else {
            panic!("expected index access")
        };
        assert!(matches!(*object, Expr::PropertyAccess { .. }));
        assert_eq!(*index, Expr::Literal(Value::number(0.0)));
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse("(1 + 2) * 3").unwrap();
        let Expr::Binary { op, left, .. } = expr else {
            panic!("expected binary")
        };
        assert_eq!(op, BinaryOp::Multiply);
        assert!(matches!(
            *left,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn unary_operators() {
        assert!(matches!(parse("-x").unwrap(), Expr::Negate(_)));
        assert!(matches!(parse("!ok").unwrap(), Expr::Not(_)));
    }

    #[test]
    fn trailing_tokens_rejected() {
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn unclosed_paren_rejected() {
        assert!(parse("(1 + 2").is_err());
    }

    #[test]
    fn dot_without_property_rejected() {
        assert!(parse("a.").is_err());
    }

    #[test]
    fn deep_nesting_hits_depth_cap() {
        let source = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(
            parse(&source).unwrap_err(),
            ExpressionError::DepthExceeded(MAX_PARSER_DEPTH)
        );
    }
}
