//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The family a diagnostic code belongs to, which picks its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Lexical problems (unscannable input), prefixed with `L`.
    Lexical,
    /// Syntax problems (unexpected or missing tokens), prefixed with `E`.
    Syntax,
    /// Structural problems (unbalanced braces, unterminated blocks), prefixed with `S`.
    Structural,
    /// Warnings about suspicious but accepted input, prefixed with `W`.
    Warning,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Lexical => 'L',
            Category::Syntax => 'E',
            Category::Structural => 'S',
            Category::Warning => 'W',
        }
    }
}

/// A category prefix plus a number, displayed like `E101`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Unscannable character or span.
    pub const INVALID_CHARACTER: DiagnosticCode = DiagnosticCode::new(Category::Lexical, 100);
    /// String literal not closed before end of line.
    pub const UNTERMINATED_STRING: DiagnosticCode = DiagnosticCode::new(Category::Lexical, 101);
    /// `@` not followed by a directive name.
    pub const EMPTY_DIRECTIVE: DiagnosticCode = DiagnosticCode::new(Category::Lexical, 102);
    /// A required token was missing.
    pub const EXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 101);
    /// A token that cannot start anything in the current construct.
    pub const UNEXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 102);
    /// A declaration was abandoned and parsing resumed on the next line.
    pub const ABANDONED_DECLARATION: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 103);
    /// Recording stopped because the error limit was reached.
    pub const TOO_MANY_ERRORS: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 199);
    /// A block reached end of input without its closing brace.
    pub const UNTERMINATED_BLOCK: DiagnosticCode = DiagnosticCode::new(Category::Structural, 201);
    /// Lists and maps nested deeper than the parser follows.
    pub const NESTING_TOO_DEEP: DiagnosticCode = DiagnosticCode::new(Category::Structural, 202);

    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Lexical.prefix(), 'L');
        assert_eq!(Category::Syntax.prefix(), 'E');
        assert_eq!(Category::Structural.prefix(), 'S');
        assert_eq!(Category::Warning.prefix(), 'W');
    }

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::EXPECTED_TOKEN.to_string(), "E101");
        assert_eq!(DiagnosticCode::new(Category::Warning, 3).to_string(), "W003");
        assert_eq!(DiagnosticCode::UNTERMINATED_BLOCK.to_string(), "S201");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::INVALID_CHARACTER;
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
