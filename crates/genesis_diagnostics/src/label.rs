//! Source annotations inside a diagnostic.
//!
//! A diagnostic underlines its offending token with a primary label. Secondary
//! labels point at related places elsewhere in the file, such as the `{` that
//! an unterminated block opened with.

use genesis_source::{Position, Span};
use serde::{Deserialize, Serialize};

/// How a label is drawn.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The offending token.
    Primary,
    /// A related location.
    Secondary,
}

impl LabelStyle {
    /// Character repeated under the labeled span.
    pub fn underline(self) -> char {
        match self {
            LabelStyle::Primary => '^',
            LabelStyle::Secondary => '-',
        }
    }
}

/// A short message attached to a span.
///
/// Like [`Diagnostic`](crate::Diagnostic), a label carries the resolved
/// position of its span so it can be placed without the source database.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// Primary or secondary.
    pub style: LabelStyle,
    /// The annotated span.
    pub span: Span,
    /// Line/column of `span`'s start.
    pub position: Position,
    /// Text shown after the underline.
    pub message: String,
}

impl Label {
    /// Creates a label.
    pub fn new(style: LabelStyle, span: Span, position: Position, message: impl Into<String>) -> Self {
        Self {
            style,
            span,
            position,
            message: message.into(),
        }
    }

    /// Labels the offending token.
    pub fn primary(span: Span, position: Position, message: impl Into<String>) -> Self {
        Self::new(LabelStyle::Primary, span, position, message)
    }

    /// Labels a related location.
    pub fn secondary(span: Span, position: Position, message: impl Into<String>) -> Self {
        Self::new(LabelStyle::Secondary, span, position, message)
    }

    /// Returns `true` for the offending-token label.
    pub fn is_primary(&self) -> bool {
        self.style == LabelStyle::Primary
    }
}
