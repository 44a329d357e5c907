//! Core parser infrastructure and the top-level program rule.
//!
//! [`Parser`] provides the primitive token operations (`check`, `eat`,
//! `consume`, `advance`) shared by the source grammar (`decl.rs`) and the
//! manifest grammar (`manifest.rs`), plus error reporting and the glue to
//! the [`SyncEngine`].

use crate::ast::*;
use crate::error::{ParseContext, ParseError};
use crate::lexer::LexMode;
use crate::recovery::{RecoveryResult, SyncEngine, SyncScope};
use crate::token::{Token, TokenKind};
use genesis_config::ParserSection;
use genesis_diagnostics::{Diagnostic, DiagnosticCode, Severity};
use genesis_source::source_file::line_text;
use genesis_source::{FileId, Position, Span};
use std::collections::HashSet;

/// Tuning for the tokenizer and parser.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Tokenizer behavior on unscannable input.
    pub lex_mode: LexMode,
    /// Maximum number of errors kept in the tree; `0` keeps all.
    pub max_errors: usize,
    /// Tokens captured on each side of an error for context.
    pub nearby_tokens: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from(&ParserSection::default())
    }
}

impl From<&ParserSection> for ParseOptions {
    fn from(section: &ParserSection) -> Self {
        Self {
            lex_mode: if section.tolerant {
                LexMode::Tolerant
            } else {
                LexMode::Strict
            },
            max_errors: section.max_errors,
            nearby_tokens: section.nearby_tokens,
        }
    }
}

/// A recursive descent parser over a token stream.
///
/// Errors never abort the parse. Each one is recorded as a [`ParseError`]
/// and the parser resumes at a safe point, so the finished tree contains
/// every declaration that could be recognized.
pub struct Parser<'src> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) source: &'src str,
    file: FileId,
    options: ParseOptions,
    errors: Vec<ParseError>,
    sync: SyncEngine,
    constructs: Vec<String>,
    /// The node being built when a declaration is abandoned.
    partial: Option<Node>,
    /// Lists and maps currently open inside a value.
    pub(crate) depth: usize,
    /// Tokenizer diagnostics, merged into the tree's errors by `finish`.
    lexical: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    /// Creates a parser. Comments are dropped and an end-of-input token is
    /// appended if the stream lacks one.
    pub fn new(tokens: Vec<Token>, source: &'src str, file: FileId, options: ParseOptions) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().filter(|t| !t.kind.is_trivia()).collect();
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = source.len() as u32;
            let position = tokens
                .last()
                .map(|t| t.position)
                .unwrap_or(Position::START);
            tokens.push(Token::new(TokenKind::Eof, "", Span::new(file, end, end), position));
        }
        Self {
            tokens,
            pos: 0,
            source,
            file,
            options,
            errors: Vec::new(),
            sync: SyncEngine::new(),
            constructs: Vec::new(),
            partial: None,
            depth: 0,
            lexical: Vec::new(),
        }
    }

    /// Carries the tokenizer's diagnostics into the finished tree.
    ///
    /// Parser errors raised at the same error tokens are dropped in favor
    /// of the tokenizer's, which say what was wrong with the text.
    pub fn with_lexical_errors(mut self, diagnostics: &[Diagnostic]) -> Self {
        let lexical = diagnostics.iter().map(|d| self.lexical_error(d)).collect();
        self.lexical = lexical;
        self
    }

    fn lexical_error(&self, diag: &Diagnostic) -> ParseError {
        let span = diag.primary_span;
        let text = self
            .source
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default();
        ParseError {
            message: diag.message.clone(),
            offending_token: Token::new(TokenKind::Error, text, span, diag.position),
            expected: Vec::new(),
            context: ParseContext {
                line_content: line_text(self.source, diag.position.line).to_string(),
                ..Default::default()
            },
            severity: diag.severity,
            code: diag.code,
            opening_token: None,
        }
    }

    /// Returns `true` if a tokenizer error starts inside `span`.
    pub(crate) fn lexical_error_within(&self, span: Span) -> bool {
        self.lexical.iter().any(|e| {
            let at = e.offending_token.span.start;
            at >= span.start && at < span.end.max(span.start + 1)
        })
    }

    // ========================================================================
    // Primitive operations
    // ========================================================================

    /// Returns the current token.
    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Returns the kind of the current token.
    pub(crate) fn kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Returns the kind of the token `n` positions ahead, or `Eof`.
    pub(crate) fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Returns `true` if the next token (after current) matches the given kind.
    pub(crate) fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek_kind(1) == kind
    }

    /// Returns `true` if the current token matches the given kind.
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// Returns `true` at end of input.
    pub(crate) fn at_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Returns `true` at a token that ends a line-oriented construct.
    pub(crate) fn at_line_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Newline | TokenKind::RightBrace | TokenKind::Eof
        )
    }

    /// Returns the span of the previous token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current().span
        }
    }

    /// Consumes and returns the current token. Never moves past `Eof`.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the current token if it matches the given kind. Returns `true` if consumed.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips blank lines.
    pub(crate) fn skip_newlines(&mut self) {
        while self.eat(TokenKind::Newline) {}
    }

    /// Expects a token of the given kind.
    ///
    /// On a mismatch the error is reported, the parser synchronizes towards
    /// `kind` or any of `follow`, and the expectation is retried once.
    /// Returns `None` if the token is still missing; the caller substitutes
    /// a default and carries on.
    pub(crate) fn consume(
        &mut self,
        kind: TokenKind,
        follow: &[TokenKind],
        scope: SyncScope,
        message: &str,
    ) -> Option<Token> {
        if self.check(kind) {
            return Some(self.advance());
        }
        let mut expected = vec![kind];
        expected.extend_from_slice(follow);
        let error = self.error_here(message, expected, DiagnosticCode::EXPECTED_TOKEN);
        self.synchronize(error, scope);
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Advances one token if nothing was consumed since `start`.
    ///
    /// Loops over block contents call this so every iteration makes
    /// progress.
    pub(crate) fn ensure_progress(&mut self, start: usize) {
        if self.pos == start {
            self.advance();
        }
    }

    /// Consumes tokens up to the end of the line and returns their source
    /// text, trimmed, with its span.
    ///
    /// Stops before a newline, end of input, any kind in `stops`, or a `}`
    /// that closes the enclosing block. Braces opened within the run are
    /// balanced, so `Return {name}` stays one run.
    pub(crate) fn scan_run(&mut self, stops: &[TokenKind]) -> (String, Span) {
        let start = self.current().span;
        let mut end = None;
        let mut depth = 0usize;
        loop {
            let kind = self.kind();
            if kind == TokenKind::Newline || kind == TokenKind::Eof || stops.contains(&kind) {
                break;
            }
            match kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth == 0 => break,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
            end = Some(self.advance().span);
        }
        match end {
            Some(end) => {
                let text = self.source[start.start as usize..end.end as usize].trim();
                (text.to_string(), start.merge(end))
            }
            None => (String::new(), start),
        }
    }

    // ========================================================================
    // Diagnostic context
    // ========================================================================

    pub(crate) fn push_construct(&mut self, name: impl Into<String>) {
        self.constructs.push(name.into());
    }

    pub(crate) fn pop_construct(&mut self) {
        self.constructs.pop();
    }

    /// Builds an error at the current token.
    pub(crate) fn error_here(
        &self,
        message: impl Into<String>,
        expected: Vec<TokenKind>,
        code: DiagnosticCode,
    ) -> ParseError {
        let token = self.current().clone();
        let radius = self.options.nearby_tokens;
        let from = self.pos.saturating_sub(radius);
        let to = (self.pos + radius + 1).min(self.tokens.len());
        let (current_construct, enclosing_constructs) = match self.constructs.split_last() {
            Some((current, enclosing)) => (current.clone(), enclosing.to_vec()),
            None => (String::new(), Vec::new()),
        };
        let line_content = line_text(self.source, token.position.line).to_string();
        ParseError {
            message: message.into(),
            offending_token: token,
            expected,
            context: ParseContext {
                current_construct,
                enclosing_constructs,
                nearby_tokens: self.tokens[from..to].to_vec(),
                line_content,
            },
            severity: Severity::Error,
            code,
            opening_token: None,
        }
    }

    /// Records an error without moving the cursor.
    pub(crate) fn report(&mut self, error: ParseError) {
        tracing::trace!(line = error.line(), column = error.column(), "{}", error.message);
        self.errors.push(error);
    }

    /// Number of errors recorded so far.
    pub(crate) fn error_count(&self) -> usize {
        self.errors.len() + self.sync.errors().len()
    }

    /// Records an "unexpected token" error at the current token.
    pub(crate) fn unexpected(&mut self, context: &str) {
        let message = format!("unexpected {} {context}", self.current().describe());
        let error = self.error_here(message, Vec::new(), DiagnosticCode::UNEXPECTED_TOKEN);
        self.report(error);
    }

    /// Hands `error` to the sync engine and moves to the resumption point.
    pub(crate) fn synchronize(&mut self, error: ParseError, scope: SyncScope) -> RecoveryResult {
        let result = self.sync.synchronize(&self.tokens, self.pos, error, scope);
        self.pos = result.new_position;
        result
    }

    /// Marks `error` as abandoning the declaration in progress and stashes
    /// the partial node for [`Parser::recover_declaration`].
    pub(crate) fn abandon(&mut self, mut error: ParseError, partial: Node) -> ParseError {
        error.severity = Severity::Fatal;
        self.partial = Some(partial);
        error
    }

    /// Recovers from a failed declaration: skips to the next line and
    /// returns whatever partial node the declaration left behind.
    pub(crate) fn recover_declaration(&mut self, error: ParseError) -> Option<Node> {
        let partial = self.partial.take();
        let result = self
            .sync
            .recover_declaration(&self.tokens, self.pos, error, partial);
        self.pos = result.new_position;
        self.constructs.truncate(1);
        result.partial_node
    }

    /// The span of the whole input.
    pub(crate) fn file_span(&self) -> Span {
        Span::new(self.file, 0, self.source.len() as u32)
    }

    /// Collects every error, ordered by position, applying the error cap.
    pub(crate) fn finish(&mut self) -> ProgramMetadata {
        let mut errors = std::mem::take(&mut self.errors);
        errors.extend(self.sync.take_errors());
        let lexical = std::mem::take(&mut self.lexical);
        let reported: HashSet<Span> = lexical.iter().map(|e| e.offending_token.span).collect();
        errors.retain(|e| {
            e.offending_token.kind != TokenKind::Error || !reported.contains(&e.offending_token.span)
        });
        errors.extend(lexical);
        errors.sort_by_key(|e| (e.line(), e.column()));

        let max = self.options.max_errors;
        let mut error_limit_reached = false;
        if max > 0 && errors.len() > max {
            let dropped = errors.len() - max;
            let mut last = errors.swap_remove(max);
            errors.truncate(max);
            last.message = format!("too many errors; {dropped} more not shown");
            last.expected.clear();
            last.severity = Severity::Error;
            last.code = DiagnosticCode::TOO_MANY_ERRORS;
            last.opening_token = None;
            errors.push(last);
            error_limit_reached = true;
        }

        ProgramMetadata {
            errors,
            error_limit_reached,
        }
    }

    // ========================================================================
    // Program
    // ========================================================================

    /// Parses a source file: functions and directives, in any order.
    pub fn parse_program(mut self) -> Program {
        self.push_construct("program");
        let mut declarations = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_eof() {
                break;
            }
            let start = self.pos;
            let result = match self.kind() {
                TokenKind::Function => self.parse_function().map(Declaration::Function),
                TokenKind::Directive | TokenKind::Question => {
                    Ok(Declaration::Directive(self.parse_directive()))
                }
                TokenKind::MarkdownHeader => {
                    self.advance();
                    continue;
                }
                _ => {
                    self.unexpected("at top level");
                    self.advance();
                    continue;
                }
            };
            match result {
                Ok(declaration) => declarations.push(declaration),
                Err(error) => match self.recover_declaration(error) {
                    Some(Node::Function(f)) => declarations.push(Declaration::Function(f)),
                    Some(Node::Directive(d)) => declarations.push(Declaration::Directive(d)),
                    _ => {}
                },
            }
            assert!(self.pos > start, "parser made no progress at token {start}");
        }

        let span = self.file_span();
        let metadata = self.finish();
        tracing::debug!(
            declarations = declarations.len(),
            errors = metadata.errors.len(),
            "parsed program"
        );
        Program {
            declarations,
            metadata,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parser(source: &str) -> Parser<'_> {
        let (tokens, _) = tokenize(source, LexMode::Tolerant);
        Parser::new(tokens, source, FileId::ANONYMOUS, ParseOptions::default())
    }

    #[test]
    fn comments_are_dropped() {
        let p = parser("a // note\nb");
        let kinds: Vec<_> = p.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn eof_is_appended_when_missing() {
        let p = Parser::new(Vec::new(), "", FileId::ANONYMOUS, ParseOptions::default());
        assert!(p.at_eof());
    }

    #[test]
    fn advance_stops_at_eof() {
        let mut p = parser("a");
        p.advance();
        p.advance();
        p.advance();
        assert!(p.at_eof());
        assert_eq!(p.pos, 1);
    }

    #[test]
    fn consume_retries_after_sync() {
        let mut p = parser("x y : z");
        let tok = p.consume(TokenKind::Colon, &[], SyncScope::Line, "expected ':'");
        assert!(tok.is_some());
        assert_eq!(p.current().text, "z");
        let metadata = p.finish();
        assert_eq!(metadata.errors.len(), 1);
        assert_eq!(metadata.errors[0].offending_token.text, "x");
    }

    #[test]
    fn consume_stops_at_follow_without_consuming() {
        let mut p = parser("{ body }");
        let tok = p.consume(
            TokenKind::Identifier,
            &[TokenKind::LeftBrace],
            SyncScope::TopLevel,
            "expected a name",
        );
        assert!(tok.is_none());
        assert!(p.check(TokenKind::LeftBrace));
    }

    #[test]
    fn scan_run_balances_braces() {
        let mut p = parser("Return {name} now } rest");
        let (text, _) = p.scan_run(&[]);
        assert_eq!(text, "Return {name} now");
        assert!(p.check(TokenKind::RightBrace));
    }

    #[test]
    fn scan_run_respects_stops() {
        let mut p = parser("./lib/util as util");
        let (text, _) = p.scan_run(&[TokenKind::As]);
        assert_eq!(text, "./lib/util");
        assert!(p.check(TokenKind::As));
    }

    #[test]
    fn error_context_captures_constructs_and_line() {
        let mut p = parser("first\nsecond third fourth");
        p.push_construct("program");
        p.push_construct("function 'f'");
        p.pos = 3;
        let err = p.error_here("boom", vec![], DiagnosticCode::UNEXPECTED_TOKEN);
        assert_eq!(err.context.current_construct, "function 'f'");
        assert_eq!(err.context.enclosing_constructs, vec!["program".to_string()]);
        assert_eq!(err.context.line_content, "second third fourth");
        assert_eq!(err.context.nearby_tokens.len(), 5);
        assert_eq!(err.offending_token.text, "third");
    }

    #[test]
    fn error_cap_keeps_limit_plus_summary() {
        let source = "} } } } }";
        let (tokens, _) = tokenize(source, LexMode::Tolerant);
        let options = ParseOptions {
            max_errors: 2,
            ..ParseOptions::default()
        };
        let program = Parser::new(tokens, source, FileId::ANONYMOUS, options).parse_program();
        assert!(program.metadata.error_limit_reached);
        assert_eq!(program.metadata.errors.len(), 3);
        let last = &program.metadata.errors[2];
        assert_eq!(last.code, DiagnosticCode::TOO_MANY_ERRORS);
        assert_eq!(last.message, "too many errors; 3 more not shown");
    }

    #[test]
    fn options_from_config_section() {
        let section = ParserSection {
            tolerant: false,
            max_errors: 7,
            nearby_tokens: 1,
        };
        let options = ParseOptions::from(&section);
        assert_eq!(options.lex_mode, LexMode::Strict);
        assert_eq!(options.max_errors, 7);
    }
}
