//! Lexer: converts an expression string into spanned tokens.

use crate::ExpressionResult;
use crate::error::ExpressionError;
use crate::token::{Span, Token, TokenKind};
use std::borrow::Cow;

/// Char-walking lexer over an expression string.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    /// Tokenize the entire input, ending with an EOF token.
    pub fn tokenize(mut self) -> ExpressionResult<Vec<Token<'a>>> {
        let mut tokens = Vec::with_capacity((self.input.len() / 4).max(8));
        loop {
            let token = self.next_token()?;
            let eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if eof {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> ExpressionResult<Token<'a>> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start)));
        };

        let kind = match ch {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '.' => self.single(TokenKind::Dot),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),

            '=' if self.peek() == Some('=') => self.double(TokenKind::Equal),
            '!' if self.peek() == Some('=') => self.double(TokenKind::NotEqual),
            '!' => self.single(TokenKind::Not),
            '<' if self.peek() == Some('=') => self.double(TokenKind::LessEqual),
            '<' => self.single(TokenKind::LessThan),
            '>' if self.peek() == Some('=') => self.double(TokenKind::GreaterEqual),
            '>' => self.single(TokenKind::GreaterThan),
            '&' if self.peek() == Some('&') => self.double(TokenKind::And),
            '|' if self.peek() == Some('|') => self.double(TokenKind::Or),

            '"' | '\'' => self.read_string(ch)?,
            c if c.is_ascii_digit() => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier_or_keyword(),

            other => {
                return Err(ExpressionError::syntax(format!(
                    "unexpected character '{other}' at position {start}"
                )));
            }
        };

        Ok(Token::new(kind, Span::new(start, self.position)))
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let current = self.current_char()?;
        self.input[self.position + current.len_utf8()..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn single(&mut self, kind: TokenKind<'a>) -> TokenKind<'a> {
        self.advance();
        kind
    }

    fn double(&mut self, kind: TokenKind<'a>) -> TokenKind<'a> {
        self.advance();
        self.advance();
        kind
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn read_string(&mut self, quote: char) -> ExpressionResult<TokenKind<'a>> {
        self.advance(); // opening quote
        let content_start = self.position;
        let mut has_escapes = false;

        while let Some(ch) = self.current_char() {
            if ch == quote {
                let content_end = self.position;
                self.advance(); // closing quote
                let raw = &self.input[content_start..content_end];
                return Ok(TokenKind::String(if has_escapes {
                    Cow::Owned(unescape(raw))
                } else {
                    Cow::Borrowed(raw)
                }));
            }
            if ch == '\\' {
                has_escapes = true;
                self.advance();
            }
            self.advance();
        }

        Err(ExpressionError::syntax("unterminated string literal"))
    }

    fn read_number(&mut self) -> ExpressionResult<TokenKind<'a>> {
        let start = self.position;
        let mut seen_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !seen_dot && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.position];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| ExpressionError::syntax(format!("invalid number literal '{text}'")))
    }

    fn read_identifier_or_keyword(&mut self) -> TokenKind<'a> {
        let start = self.position;
        while self
            .current_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }

        match &self.input[start..self.position] {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null" => TokenKind::Null,
            name => TokenKind::Identifier(name),
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
        } else {
            result.push(ch);
        }
    }
    result
}
