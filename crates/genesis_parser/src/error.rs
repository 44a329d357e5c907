//! Structured parse errors.

use crate::token::{Token, TokenKind};
use genesis_diagnostics::{Diagnostic, DiagnosticCode, Label, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A syntax problem found while parsing.
///
/// Parse errors are collected into the tree rather than returned; the
/// parser always produces a best-effort tree.
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// The token at which the problem was detected.
    pub offending_token: Token,
    /// Token kinds that would have been accepted, if known.
    pub expected: Vec<TokenKind>,
    /// Where in the grammar the parser was.
    pub context: ParseContext,
    /// `Error`, or `Fatal` when a whole declaration had to be abandoned.
    pub severity: Severity,
    /// Diagnostic code.
    pub code: DiagnosticCode,
    /// The `{` or `[` an unterminated block or list opened with.
    #[serde(default)]
    pub opening_token: Option<Token>,
}

/// Surrounding information for a [`ParseError`]. Only used for messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseContext {
    /// The construct being parsed (`"function greet"`, `"config block"`).
    pub current_construct: String,
    /// Outer constructs, outermost first.
    pub enclosing_constructs: Vec<String>,
    /// Tokens around the offending one.
    pub nearby_tokens: Vec<Token>,
    /// The full source line of the offending token.
    pub line_content: String,
}

impl ParseError {
    /// 1-indexed line of the offending token.
    pub fn line(&self) -> u32 {
        self.offending_token.position.line
    }

    /// 1-indexed column of the offending token.
    pub fn column(&self) -> u32 {
        self.offending_token.position.column
    }

    /// Returns `true` if the error abandoned a whole declaration.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// Records the token an unterminated construct opened with, unless an
    /// inner construct already did.
    pub(crate) fn opened_at(mut self, open: &Token) -> Self {
        if self.opening_token.is_none() {
            self.opening_token = Some(open.clone());
        }
        self
    }

    /// Converts into a renderable diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let token = &self.offending_token;
        let label = if self.expected.is_empty() {
            format!("found {}", token.describe())
        } else {
            format!("expected {}", describe_expected(&self.expected))
        };
        let mut diag = Diagnostic::new(
            self.severity,
            self.code,
            self.message.clone(),
            token.span,
            token.position,
        )
        .with_label(Label::primary(token.span, token.position, label));
        if let Some(open) = &self.opening_token {
            diag = diag.with_label(Label::secondary(open.span, open.position, "opened here"));
        }
        let ctx = &self.context;
        if !ctx.current_construct.is_empty() {
            let note = match ctx.enclosing_constructs.last() {
                Some(outer) => format!("while parsing {} (in {outer})", ctx.current_construct),
                None => format!("while parsing {}", ctx.current_construct),
            };
            diag = diag.with_note(note);
        }
        diag
    }
}

/// Formats a list of kinds as `'{', identifier or newline`.
pub(crate) fn describe_expected(kinds: &[TokenKind]) -> String {
    match kinds {
        [] => String::new(),
        [one] => one.describe().to_string(),
        [init @ .., last] => {
            let head: Vec<_> = init.iter().map(|k| k.describe()).collect();
            format!("{} or {}", head.join(", "), last.describe())
        }
    }
}
