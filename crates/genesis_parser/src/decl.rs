//! Declaration parsing: functions, directives, and values.

use crate::ast::*;
use crate::error::ParseError;
use crate::parser::Parser;
use crate::recovery::SyncScope;
use crate::token::{Token, TokenKind};
use genesis_diagnostics::DiagnosticCode;
use genesis_source::Span;
use indexmap::IndexMap;

/// Name given to a function whose name is missing.
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// Lists and maps nested deeper than this are skipped, not parsed.
pub const MAX_NESTING: usize = 64;

/// One `key: value` entry of a block.
pub(crate) struct Entry {
    /// The key token, for error locations.
    pub(crate) key: Token,
    pub(crate) value: Value,
    /// From the key through the end of the value.
    pub(crate) span: Span,
}

impl Parser<'_> {
    /// Parses `function name { body }`.
    ///
    /// A missing name is replaced with `"unknown"`. If the body never opens
    /// or never closes the declaration is abandoned, and the function built
    /// so far is kept as the partial node.
    pub(crate) fn parse_function(&mut self) -> Result<FunctionDeclaration, ParseError> {
        let errors_before = self.error_count();
        let start = self.advance().span; // 'function'

        let name = if self.kind() == TokenKind::Identifier
            || (self.kind().is_keyword() && !self.check(TokenKind::Function))
        {
            self.advance().text
        } else {
            match self.consume(
                TokenKind::Identifier,
                &[TokenKind::LeftBrace],
                SyncScope::TopLevel,
                "expected a function name",
            ) {
                Some(token) => token.text,
                None => UNKNOWN_FUNCTION.to_string(),
            }
        };

        self.push_construct(format!("function '{name}'"));
        let mut function = FunctionDeclaration {
            name,
            body: Vec::new(),
            metadata: FunctionMetadata::default(),
            span: start,
        };
        let result = self.function_body(&mut function);
        self.pop_construct();
        function.span = start.merge(self.prev_span());
        function.metadata.has_errors = result.is_err()
            || self.error_count() > errors_before
            || self.lexical_error_within(function.span);

        match result {
            Ok(()) => Ok(function),
            Err(error) => Err(self.abandon(error, Node::Function(function))),
        }
    }

    fn function_body(&mut self, function: &mut FunctionDeclaration) -> Result<(), ParseError> {
        // The brace may sit on its own line after the name.
        let mut n = 0;
        while self.peek_kind(n) == TokenKind::Newline {
            n += 1;
        }
        if self.peek_kind(n) == TokenKind::LeftBrace {
            self.skip_newlines();
        }
        let Some(open) = self.consume(
            TokenKind::LeftBrace,
            &[],
            SyncScope::TopLevel,
            "expected '{' to open the function body",
        ) else {
            return Err(self.error_here(
                format!("function '{}' has no body", function.name),
                Vec::new(),
                DiagnosticCode::ABANDONED_DECLARATION,
            ));
        };

        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::RightBrace => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Eof => {
                    return Err(self
                        .error_here(
                            format!("unterminated body of function '{}'", function.name),
                            vec![TokenKind::RightBrace],
                            DiagnosticCode::UNTERMINATED_BLOCK,
                        )
                        .opened_at(&open));
                }
                TokenKind::Directive | TokenKind::Question => {
                    let directive = self.parse_directive();
                    if directive.name == "question" {
                        let text = directive.text().unwrap_or_default().to_string();
                        function.metadata.ai_questions.push(text);
                    } else {
                        function.metadata.directives.push(directive.name.clone());
                    }
                    function.body.push(Statement::Directive(directive));
                }
                TokenKind::MarkdownHeader => {
                    self.advance();
                }
                kind if kind.is_word()
                    || kind == TokenKind::StringLiteral
                    || kind == TokenKind::Number =>
                {
                    let (text, span) = self.scan_run(&[]);
                    function
                        .body
                        .push(Statement::NaturalLanguage(NaturalLanguageExpression { text, span }));
                }
                _ => {
                    self.unexpected("in function body");
                    self.advance();
                }
            }
        }
    }

    /// Parses a directive or `@question` marker and its parameters.
    ///
    /// `@name key: value, key: value` yields named parameters. Anything else
    /// up to the end of the line is stored as the `text` parameter: the
    /// unquoted string if the line is a single string literal, otherwise the
    /// raw text.
    pub(crate) fn parse_directive(&mut self) -> AiDirective {
        let marker = self.advance();
        let name = marker.directive_name().to_string();
        self.push_construct(format!("directive '@{name}'"));

        let mut parameters = IndexMap::new();
        if self.at_line_end() {
            // Bare marker.
        } else if self.at_key_value() {
            self.directive_parameters(&mut parameters);
        } else if self.check(TokenKind::StringLiteral) && self.value_ends_at(1, &[]) {
            parameters.insert("text".to_string(), Value::String(self.advance().unquoted()));
        } else {
            let (text, _) = self.scan_run(&[]);
            parameters.insert("text".to_string(), Value::String(text));
        }

        self.pop_construct();
        AiDirective {
            name,
            parameters,
            span: marker.span.merge(self.prev_span()),
        }
    }

    fn directive_parameters(&mut self, parameters: &mut IndexMap<String, Value>) {
        loop {
            let key = self.advance().unquoted();
            self.advance(); // ':'
            match self.parse_value(&[TokenKind::Comma]) {
                Ok(value) => {
                    parameters.insert(key, value);
                }
                Err(error) => {
                    self.synchronize(error, SyncScope::Line);
                    return;
                }
            }
            if self.at_line_end() {
                return;
            }
            if !self.eat(TokenKind::Comma) || !self.at_key_value() {
                let error = self.error_here(
                    "expected ', key: value' or end of line after directive parameter",
                    Vec::new(),
                    DiagnosticCode::EXPECTED_TOKEN,
                );
                self.synchronize(error, SyncScope::Line);
                return;
            }
        }
    }

    /// Returns `true` at `key:` where the key is a word or string.
    pub(crate) fn at_key_value(&self) -> bool {
        let key = self.kind();
        (key.is_word() || key == TokenKind::StringLiteral) && self.peek_is(TokenKind::Colon)
    }

    /// Returns `true` if the token `n` ahead ends a value.
    pub(crate) fn value_ends_at(&self, n: usize, stops: &[TokenKind]) -> bool {
        let kind = self.peek_kind(n);
        matches!(
            kind,
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::RightBrace
                | TokenKind::RightBracket
                | TokenKind::Comma
        ) || stops.contains(&kind)
    }

    /// Parses a value: a literal, a `[list]`, a `{map}`, or failing those the
    /// raw text up to the end of the line or a token in `stops`.
    ///
    /// Only a missing value is an error.
    pub(crate) fn parse_value(&mut self, stops: &[TokenKind]) -> Result<Value, ParseError> {
        let kind = self.kind();
        if self.at_line_end() || kind == TokenKind::Comma || stops.contains(&kind) {
            return Err(self.error_here(
                "expected a value",
                vec![TokenKind::StringLiteral, TokenKind::Number, TokenKind::Identifier],
                DiagnosticCode::EXPECTED_TOKEN,
            ));
        }
        let literal_ends = self.value_ends_at(1, stops);
        match kind {
            TokenKind::StringLiteral if literal_ends => Ok(Value::String(self.advance().unquoted())),
            TokenKind::Number if literal_ends => {
                let token = self.advance();
                match token.text.parse::<f64>() {
                    Ok(n) => Ok(Value::Number(n)),
                    Err(_) => Ok(Value::String(token.text)),
                }
            }
            TokenKind::True if literal_ends => {
                self.advance();
                Ok(Value::Bool(true))
            }
            TokenKind::False if literal_ends => {
                self.advance();
                Ok(Value::Bool(false))
            }
            TokenKind::LeftBracket | TokenKind::LeftBrace if self.depth >= MAX_NESTING => {
                self.skip_too_deep()
            }
            TokenKind::LeftBracket => self.parse_list(TokenKind::RightBracket).map(Value::List),
            TokenKind::LeftBrace if self.at_brace_list() => {
                self.parse_list(TokenKind::RightBrace).map(Value::List)
            }
            TokenKind::LeftBrace => self.parse_map(),
            _ => {
                let mut run_stops = vec![TokenKind::Comma, TokenKind::RightBracket];
                run_stops.extend_from_slice(stops);
                let (text, _) = self.scan_run(&run_stops);
                Ok(Value::String(text))
            }
        }
    }

    fn parse_map(&mut self) -> Result<Value, ParseError> {
        let open = self.advance();
        self.depth += 1;
        let mut entries = IndexMap::new();
        let result = self.block_entries(&mut entries);
        self.depth -= 1;
        result.map_err(|e| e.opened_at(&open))?;
        Ok(Value::Map(
            entries.into_iter().map(|(k, e)| (k, e.value)).collect(),
        ))
    }

    /// Steps over a list or map opened past [`MAX_NESTING`] levels by
    /// counting brackets, without descending into it. The skipped value
    /// becomes an empty map.
    fn skip_too_deep(&mut self) -> Result<Value, ParseError> {
        let open = self.current().clone();
        let error = self.error_here(
            format!("values nested more than {MAX_NESTING} levels deep"),
            Vec::new(),
            DiagnosticCode::NESTING_TOO_DEEP,
        );
        self.report(error);
        let mut unclosed = 0usize;
        loop {
            match self.kind() {
                TokenKind::LeftBrace | TokenKind::LeftBracket => unclosed += 1,
                TokenKind::RightBrace | TokenKind::RightBracket => {
                    unclosed = unclosed.saturating_sub(1);
                    if unclosed == 0 {
                        self.advance();
                        return Ok(Value::Map(IndexMap::new()));
                    }
                }
                TokenKind::Eof => {
                    return Err(self
                        .error_here(
                            "unterminated block",
                            vec![TokenKind::RightBrace],
                            DiagnosticCode::UNTERMINATED_BLOCK,
                        )
                        .opened_at(&open));
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Returns `true` if the `{` at the cursor opens a list of bare items
    /// (`{ "a", "b" }`) rather than a block of entries.
    fn at_brace_list(&self) -> bool {
        let mut n = 1;
        while self.peek_kind(n) == TokenKind::Newline {
            n += 1;
        }
        let first = self.peek_kind(n);
        let is_item =
            first.is_word() || first == TokenKind::StringLiteral || first == TokenKind::Number;
        is_item
            && matches!(
                self.peek_kind(n + 1),
                TokenKind::Comma | TokenKind::Newline | TokenKind::RightBrace
            )
    }

    /// Parses `[a, b, c]`, or `{a, b, c}` when `close` is `}`. Items are
    /// separated by commas or newlines.
    fn parse_list(&mut self, close: TokenKind) -> Result<Vec<Value>, ParseError> {
        let open = self.advance();
        self.depth += 1;
        self.push_construct("list");
        let mut items = Vec::new();
        let result = loop {
            self.skip_newlines();
            if self.eat(close) {
                break Ok(());
            }
            let stray_brace = close == TokenKind::RightBracket && self.check(TokenKind::RightBrace);
            if self.at_eof() || stray_brace {
                break Err(self
                    .error_here("unterminated list", vec![close], DiagnosticCode::EXPECTED_TOKEN)
                    .opened_at(&open));
            }
            let start = self.pos;
            match self.parse_value(&[close]) {
                Ok(value) => items.push(value),
                Err(mut error) => {
                    error.expected = vec![TokenKind::Comma, close];
                    self.synchronize(error, SyncScope::Block);
                }
            }
            self.eat(TokenKind::Comma);
            self.ensure_progress(start);
        };
        self.pop_construct();
        self.depth -= 1;
        result.map(|()| items)
    }

    /// Parses the entries of a `{ ... }` block after the opening brace,
    /// through the closing brace.
    ///
    /// Entries are `key: value` or `key { ... }`, separated by commas or
    /// newlines. Entries parsed before an error remain in `entries`. The
    /// only error returned is a block that never closes.
    pub(crate) fn block_entries(
        &mut self,
        entries: &mut IndexMap<String, Entry>,
    ) -> Result<(), ParseError> {
        loop {
            while self.eat(TokenKind::Newline) || self.eat(TokenKind::Comma) {}
            if self.eat(TokenKind::RightBrace) {
                return Ok(());
            }
            if self.at_eof() {
                return Err(self.error_here(
                    "unterminated block",
                    vec![TokenKind::RightBrace],
                    DiagnosticCode::UNTERMINATED_BLOCK,
                ));
            }
            let start = self.pos;
            match self.block_entry() {
                Ok((key, entry)) => {
                    entries.insert(key, entry);
                }
                Err(error) if error.code == DiagnosticCode::UNTERMINATED_BLOCK => return Err(error),
                Err(error) => {
                    self.synchronize(error, SyncScope::Line);
                }
            }
            if !self.at_line_end() && !self.check(TokenKind::Comma) {
                self.unexpected("after block entry");
                self.scan_run(&[TokenKind::Comma]);
            }
            self.ensure_progress(start);
        }
    }

    fn block_entry(&mut self) -> Result<(String, Entry), ParseError> {
        let kind = self.kind();
        if !(kind.is_word() || kind == TokenKind::StringLiteral || kind == TokenKind::Number) {
            return Err(self.error_here(
                format!("expected a key, found {}", self.current().describe()),
                vec![TokenKind::Identifier, TokenKind::StringLiteral],
                DiagnosticCode::EXPECTED_TOKEN,
            ));
        }
        let key_token = self.advance();
        let key = key_token.unquoted();
        self.push_construct(format!("entry '{key}'"));
        let value = if self.check(TokenKind::LeftBrace) {
            self.parse_value(&[])
        } else if self.eat(TokenKind::Colon) {
            self.parse_value(&[TokenKind::Comma])
        } else {
            Err(self.error_here(
                format!("expected ':' after '{key}'"),
                vec![TokenKind::Colon],
                DiagnosticCode::EXPECTED_TOKEN,
            ))
        };
        self.pop_construct();
        let value = value?;
        let span = key_token.span.merge(self.prev_span());
        Ok((
            key,
            Entry {
                key: key_token,
                value,
                span,
            },
        ))
    }
}
