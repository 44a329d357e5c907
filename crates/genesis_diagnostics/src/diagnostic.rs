//! Structured diagnostic messages.

use crate::code::DiagnosticCode;
use crate::label::Label;
use crate::severity::Severity;
use genesis_source::{Position, Span};
use serde::{Deserialize, Serialize};

/// A structured problem report.
///
/// Besides the byte span used for rendering, every diagnostic carries its
/// resolved 1-indexed [`Position`], so consumers can show `line:column`
/// without access to the source database.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Code identifying the kind of problem.
    pub code: DiagnosticCode,
    /// The main message.
    pub message: String,
    /// Where the problem was detected.
    pub primary_span: Span,
    /// Line/column of `primary_span`'s start.
    pub position: Position,
    /// Annotated spans.
    pub labels: Vec<Label>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions.
    pub help: Vec<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with the given severity.
    pub fn new(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
        position: Position,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            primary_span: span,
            position,
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates an error diagnostic.
    pub fn error(
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
        position: Position,
    ) -> Self {
        Self::new(Severity::Error, code, message, span, position)
    }

    /// Creates a fatal diagnostic.
    pub fn fatal(
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
        position: Position,
    ) -> Self {
        Self::new(Severity::Fatal, code, message, span, position)
    }

    /// Creates a warning diagnostic.
    pub fn warning(
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
        position: Position,
    ) -> Self {
        Self::new(Severity::Warning, code, message, span, position)
    }

    /// Line of the primary location (1-indexed).
    pub fn line(&self) -> u32 {
        self.position.line
    }

    /// Column of the primary location (1-indexed).
    pub fn column(&self) -> u32 {
        self.position.column
    }

    /// Adds a label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}
