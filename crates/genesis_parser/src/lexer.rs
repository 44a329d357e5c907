//! Tokenizer for Genesis source and manifest files.
//!
//! Converts source text into a sequence of [`Token`]s. Horizontal whitespace
//! is skipped but line breaks are kept as [`TokenKind::Newline`], since
//! directives and free-text statements end at the end of a line. Comments are
//! kept as trivia tokens; the parser filters them.
//!
//! Anything that is not punctuation, a string, a marker, or a comment is a
//! *word*: a maximal run of non-whitespace, non-structural characters. Words
//! are then classified as numbers, keywords, identifiers, or free text, which
//! is what lets prose like `Don't trim the user's input.` scan without errors.

use crate::token::{lookup_keyword, Token, TokenKind};
use genesis_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
use genesis_source::{FileId, Position, Span};

/// How the tokenizer reacts to input it cannot scan.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LexMode {
    /// Emit an [`TokenKind::Error`] token and keep going.
    #[default]
    Tolerant,
    /// Report a fatal diagnostic and end the token stream at the bad input.
    Strict,
}

/// Tokenizes a string that is not registered in a source database.
///
/// Pure function of its inputs: returns the tokens and every diagnostic
/// produced along the way. The token list is never empty and always ends
/// with [`TokenKind::Eof`].
pub fn tokenize(source: &str, mode: LexMode) -> (Vec<Token>, Vec<Diagnostic>) {
    let sink = DiagnosticSink::new();
    let tokens = lex(source, FileId::ANONYMOUS, &sink, mode);
    (tokens, sink.take_all())
}

/// Tokenizes the text of a file, reporting problems to `sink`.
pub fn lex(source: &str, file: FileId, sink: &DiagnosticSink, mode: LexMode) -> Vec<Token> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        line: 1,
        column: 1,
        line_start: true,
        file,
        sink,
        mode,
    };
    let tokens = lexer.lex_all();
    tracing::debug!(tokens = tokens.len(), ?mode, "tokenized");
    tokens
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    /// Only horizontal whitespace seen since the last line break.
    line_start: bool,
    file: FileId,
    sink: &'a DiagnosticSink,
    mode: LexMode,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_horizontal_whitespace();
            if self.pos >= self.source.len() {
                break;
            }
            let start = self.pos;
            let position = self.position();
            let token = self.next_token(start, position);
            if token.kind == TokenKind::Error && self.mode == LexMode::Strict {
                break;
            }
            self.line_start = token.kind == TokenKind::Newline;
            tokens.push(token);
        }
        tokens.push(Token::new(
            TokenKind::Eof,
            "",
            Span::new(self.file, self.pos as u32, self.pos as u32),
            self.position(),
        ));
        tokens
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn make(&self, kind: TokenKind, start: usize, position: Position) -> Token {
        Token::new(
            kind,
            &self.source[start..self.pos],
            Span::new(self.file, start as u32, self.pos as u32),
            position,
        )
    }

    fn error(&self, code: DiagnosticCode, msg: String, token: &Token) {
        let severity = match self.mode {
            LexMode::Tolerant => Severity::Error,
            LexMode::Strict => Severity::Fatal,
        };
        self.sink
            .emit(Diagnostic::new(severity, code, msg, token.span, token.position));
    }

    fn skip_horizontal_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    /// `//` only opens a comment at the start of a word, so `http://host`
    /// stays text.
    fn at_comment_start(&self) -> bool {
        if self.peek() != Some('/') || self.peek_at(1) != Some('/') {
            return false;
        }
        match self.source[..self.pos].chars().next_back() {
            None => true,
            Some(prev) => prev.is_whitespace(),
        }
    }

    fn next_token(&mut self, start: usize, position: Position) -> Token {
        let Some(c) = self.peek() else {
            return self.make(TokenKind::Eof, start, position);
        };

        if c == '\n' {
            self.bump();
            return self.make(TokenKind::Newline, start, position);
        }
        if self.at_comment_start() {
            self.bump_to_line_end();
            return self.make(TokenKind::Comment, start, position);
        }
        if c == '#' && self.line_start {
            self.bump_to_line_end();
            return self.make(TokenKind::MarkdownHeader, start, position);
        }

        let punct = match c {
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            '[' => Some(TokenKind::LeftBracket),
            ']' => Some(TokenKind::RightBracket),
            ':' => Some(TokenKind::Colon),
            ',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = punct {
            self.bump();
            return self.make(kind, start, position);
        }

        match c {
            '"' => self.lex_string(start, position),
            '@' => self.lex_marker(start, position),
            c if c.is_control() => {
                self.bump();
                let token = self.make(TokenKind::Error, start, position);
                self.error(
                    DiagnosticCode::INVALID_CHARACTER,
                    format!("invalid character {:?}", c),
                    &token,
                );
                token
            }
            _ => self.lex_word(start, position),
        }
    }

    fn bump_to_line_end(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        // Keep a trailing '\r' out of the token text.
        if self.source[..self.pos].ends_with('\r') {
            self.pos -= 1;
            self.column -= 1;
        }
    }

    fn lex_string(&mut self, start: usize, position: Position) -> Token {
        self.bump(); // opening quote
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    return self.make(TokenKind::StringLiteral, start, position);
                }
                Some('\\') => {
                    self.bump();
                    if self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('\n') | None => {
                    let token = self.make(TokenKind::Error, start, position);
                    self.error(
                        DiagnosticCode::UNTERMINATED_STRING,
                        "unterminated string literal".to_string(),
                        &token,
                    );
                    return token;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn lex_marker(&mut self, start: usize, position: Position) -> Token {
        self.bump(); // '@'
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        let name = &self.source[start + 1..self.pos];
        if name.is_empty() {
            let token = self.make(TokenKind::Error, start, position);
            self.error(
                DiagnosticCode::EMPTY_DIRECTIVE,
                "expected a directive name after '@'".to_string(),
                &token,
            );
            return token;
        }
        let kind = if name == "question" {
            TokenKind::Question
        } else {
            TokenKind::Directive
        };
        self.make(kind, start, position)
    }

    fn lex_word(&mut self, start: usize, position: Position) -> Token {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c.is_control() || is_structural(c) {
                break;
            }
            self.bump();
        }
        let word = &self.source[start..self.pos];
        let kind = classify_word(word);
        self.make(kind, start, position)
    }
}

fn is_structural(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ':' | ',' | '"')
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_number(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    let (int, frac) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

fn classify_word(word: &str) -> TokenKind {
    if is_number(word) {
        return TokenKind::Number;
    }
    let mut chars = word.chars();
    let is_ident = chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char);
    if is_ident {
        lookup_keyword(word).unwrap_or(TokenKind::Identifier)
    } else {
        TokenKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diags) = tokenize(source, LexMode::Tolerant);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_is_just_eof() {
        let (tokens, diags) = tokenize("", LexMode::Tolerant);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(diags.is_empty());
    }

    #[test]
    fn whitespace_only() {
        assert_eq!(lex_kinds("   \t  "), vec![TokenKind::Eof]);
    }

    #[test]
    fn function_header() {
        use TokenKind::*;
        assert_eq!(
            lex_kinds("function greet {\n}"),
            vec![Function, Identifier, LeftBrace, Newline, RightBrace, Eof]
        );
    }

    #[test]
    fn words_are_classified() {
        use TokenKind::*;
        assert_eq!(
            lex_kinds("Return the user's name 42 -3.5 1.0.0 ./lib gpt-4"),
            vec![Identifier, Identifier, Text, Identifier, Number, Number, Text, Text, Identifier, Eof]
        );
    }

    #[test]
    fn directives_and_questions() {
        let (tokens, _) = tokenize("@project \"todo\"\n@question \"why?\"", LexMode::Tolerant);
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].directive_name(), "project");
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].unquoted(), "todo");
        assert_eq!(tokens[3].kind, TokenKind::Question);
    }

    #[test]
    fn markdown_header_only_at_line_start() {
        use TokenKind::*;
        assert_eq!(
            lex_kinds("# Title\nstep #1"),
            vec![MarkdownHeader, Newline, Identifier, Text, Eof]
        );
    }

    #[test]
    fn indented_header_is_still_a_header() {
        let (tokens, _) = tokenize("   ## Description", LexMode::Tolerant);
        assert_eq!(tokens[0].kind, TokenKind::MarkdownHeader);
        assert_eq!(tokens[0].text, "## Description");
    }

    #[test]
    fn comments_require_word_boundary() {
        use TokenKind::*;
        assert_eq!(lex_kinds("a // note"), vec![Identifier, Comment, Eof]);
        assert_eq!(
            lex_kinds("url: http://example.com"),
            vec![Identifier, Colon, Identifier, Colon, Text, Eof]
        );
    }

    #[test]
    fn crlf_is_kept_out_of_line_tokens() {
        let (tokens, _) = tokenize("# Head\r\nx", LexMode::Tolerant);
        assert_eq!(tokens[0].text, "# Head");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
    }

    #[test]
    fn positions_are_one_indexed() {
        let (tokens, _) = tokenize("function a {\n  Say hi\n}", LexMode::Tolerant);
        let say = tokens.iter().find(|t| t.text == "Say").unwrap();
        assert_eq!(say.position, Position::new(2, 3));
        let close = tokens.iter().find(|t| t.kind == TokenKind::RightBrace).unwrap();
        assert_eq!(close.position, Position::new(3, 1));
    }

    #[test]
    fn spans_cover_token_text() {
        let source = "config { port: 8080 }";
        let (tokens, _) = tokenize(source, LexMode::Tolerant);
        for t in &tokens {
            assert_eq!(&source[t.span.start as usize..t.span.end as usize], t.text);
        }
    }

    #[test]
    fn punctuation() {
        use TokenKind::*;
        assert_eq!(
            lex_kinds("{ } [ ] : ,"),
            vec![LeftBrace, RightBrace, LeftBracket, RightBracket, Colon, Comma, Eof]
        );
    }

    #[test]
    fn string_with_escaped_quote() {
        let (tokens, diags) = tokenize(r#""a \"b\" c""#, LexMode::Tolerant);
        assert!(diags.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].unquoted(), "a \"b\" c");
    }

    #[test]
    fn unterminated_string_is_error_token_in_tolerant_mode() {
        let (tokens, diags) = tokenize("@project \"todo\nnext", LexMode::Tolerant);
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[2].kind, TokenKind::Newline);
        assert_eq!(tokens[3].text, "next");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::UNTERMINATED_STRING);
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn strict_mode_stops_at_first_error() {
        let (tokens, diags) = tokenize("a \u{1} b c", LexMode::Strict);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Eof]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Fatal);
        assert_eq!(diags[0].position, Position::new(1, 3));
    }

    #[test]
    fn tolerant_mode_continues_after_control_character() {
        let (tokens, diags) = tokenize("a \u{1} b", LexMode::Tolerant);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Error, TokenKind::Identifier, TokenKind::Eof]
        );
        assert_eq!(diags[0].code, DiagnosticCode::INVALID_CHARACTER);
    }

    #[test]
    fn bare_at_sign_is_an_error() {
        let (tokens, diags) = tokenize("@ oops", LexMode::Tolerant);
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diags[0].code, DiagnosticCode::EMPTY_DIRECTIVE);
    }

    #[test]
    fn unicode_prose_scans_cleanly() {
        let (tokens, diags) = tokenize("Grüße an café et résumé", LexMode::Tolerant);
        assert!(diags.is_empty());
        assert!(tokens[..tokens.len() - 1]
            .iter()
            .all(|t| t.kind == TokenKind::Text || t.kind == TokenKind::Identifier));
    }

    #[test]
    fn eof_always_present() {
        for src in ["", "\n\n", "\"", "@", "}}}}", "\u{0}\u{0}"] {
            for mode in [LexMode::Tolerant, LexMode::Strict] {
                let (tokens, _) = tokenize(src, mode);
                assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof), "{src:?}");
            }
        }
    }
}
