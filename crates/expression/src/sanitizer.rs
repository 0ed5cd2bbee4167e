//! Advisory pre-evaluation screening.

use crate::error::ExpressionError;

/// Substrings the sanitizer refuses. Matching is case-insensitive.
const FORBIDDEN_FRAGMENTS: &[&str] = &[
    "DROP", "DELETE", "exec", "eval", "System.", "Runtime.",
];

/// Rejects expressions containing recognized dangerous fragments before
/// they reach the evaluator.
///
/// This is advisory screening, not a security boundary: the expression
/// language itself has no I/O, so the sanitizer exists to catch authors
/// pasting query or shell fragments where an expression belongs.
#[derive(Debug, Clone)]
pub struct ExpressionSanitizer {
    fragments: Vec<&'static str>,
}

impl Default for ExpressionSanitizer {
    fn default() -> Self {
        Self {
            fragments: FORBIDDEN_FRAGMENTS.to_vec(),
        }
    }
}

impl ExpressionSanitizer {
    /// Create a sanitizer with the default fragment list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check an expression source, returning it unchanged if clean.
    pub fn check<'a>(&self, source: &'a str) -> Result<&'a str, ExpressionError> {
        let lowered = source.to_lowercase();
        for fragment in &self.fragments {
            if lowered.contains(&fragment.to_lowercase()) {
                return Err(ExpressionError::Rejected(fragment));
            }
        }
        Ok(source)
    }
}
