//! Panic-mode error recovery.
//!
//! When the parser cannot continue, it hands the [`SyncEngine`] the token
//! stream, its cursor, and a [`ParseError`]. The engine records the error and
//! picks a resumption point at or after the cursor: the nearest token of an
//! expected kind, or the nearest boundary for the current [`SyncScope`],
//! whichever comes first. Without either, parsing resumes at end of input.
//!
//! The cursor never moves backwards. Together with the parser always
//! consuming at least one token per declaration, this bounds the number of
//! steps on any input by the number of tokens.

use crate::ast::Node;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

/// Which tokens count as a safe place to resume.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncScope {
    /// Between declarations: newlines, closing braces, declaration
    /// keywords, and directive markers.
    TopLevel,
    /// Inside a single `key: value` line: newlines and closing braces.
    Line,
    /// Inside a multi-line block where newlines carry no meaning: closing
    /// braces, declaration keywords, and directive markers.
    Block,
}

impl SyncScope {
    fn is_boundary(self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::RightBrace | TokenKind::Eof => true,
            TokenKind::Newline => matches!(self, SyncScope::TopLevel | SyncScope::Line),
            TokenKind::Directive | TokenKind::Question => {
                matches!(self, SyncScope::TopLevel | SyncScope::Block)
            }
            kind if kind == TokenKind::Function || kind.is_section_keyword() => {
                matches!(self, SyncScope::TopLevel | SyncScope::Block)
            }
            _ => false,
        }
    }
}

/// The outcome of one recovery step.
#[derive(Clone, Debug)]
pub struct RecoveryResult {
    /// `true` if the resumption point is an expected token or a boundary
    /// other than end of input.
    pub recovered: bool,
    /// Token index to resume at. Never less than the index passed in.
    pub new_position: usize,
    /// Number of tokens skipped.
    pub skipped: usize,
    /// Errors recorded by this step. Never empty.
    pub diagnostics: Vec<ParseError>,
    /// A partially built node the caller may keep.
    pub partial_node: Option<Node>,
}

/// Computes resumption points and keeps a log of every error it was given.
#[derive(Debug, Default)]
pub struct SyncEngine {
    log: Vec<ParseError>,
}

impl SyncEngine {
    /// Creates an engine with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips forward from `position` to the nearest token whose kind is in
    /// `error.expected`, or to the nearest boundary for `scope`.
    ///
    /// The expected token itself is not consumed.
    pub fn synchronize(
        &mut self,
        tokens: &[Token],
        position: usize,
        error: ParseError,
        scope: SyncScope,
    ) -> RecoveryResult {
        let eof = last_index(tokens, position);
        let mut new_position = eof;
        let mut recovered = false;
        for (index, token) in tokens.iter().enumerate().skip(position) {
            if error.expected.contains(&token.kind) {
                new_position = index;
                recovered = true;
                break;
            }
            if scope.is_boundary(token.kind) {
                new_position = index;
                recovered = token.kind != TokenKind::Eof;
                break;
            }
        }
        self.finish(tokens, position, new_position, recovered, error, None)
    }

    /// Abandons the declaration in progress and resumes at the first token
    /// of the next source line.
    ///
    /// `partial` is whatever the parser managed to build before failing; it
    /// is returned unchanged in the result.
    pub fn recover_declaration(
        &mut self,
        tokens: &[Token],
        position: usize,
        error: ParseError,
        partial: Option<Node>,
    ) -> RecoveryResult {
        let eof = last_index(tokens, position);
        let new_position = tokens
            .iter()
            .enumerate()
            .skip(position)
            .find(|(_, t)| t.kind == TokenKind::Newline)
            .map(|(index, _)| (index + 1).min(eof))
            .unwrap_or(eof);
        let recovered = new_position < eof;
        self.finish(tokens, position, new_position, recovered, error, partial)
    }

    /// Every error recorded so far, in the order received.
    pub fn errors(&self) -> &[ParseError] {
        &self.log
    }

    /// Drains the error log.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.log)
    }

    fn finish(
        &mut self,
        tokens: &[Token],
        position: usize,
        new_position: usize,
        recovered: bool,
        error: ParseError,
        partial_node: Option<Node>,
    ) -> RecoveryResult {
        assert!(
            new_position >= position,
            "error recovery moved the cursor backwards ({position} -> {new_position})"
        );
        tracing::trace!(
            from = position,
            to = new_position,
            recovered,
            resume_at = ?tokens.get(new_position).map(|t| t.kind),
            "synchronized"
        );
        self.log.push(error.clone());
        RecoveryResult {
            recovered,
            new_position,
            skipped: new_position - position,
            diagnostics: vec![error],
            partial_node,
        }
    }
}

/// Index of the final token, clamped so it is never before `position`.
fn last_index(tokens: &[Token], position: usize) -> usize {
    tokens.len().saturating_sub(1).max(position)
}
