//! Token types produced by the tokenizer.
//!
//! [`TokenKind`] is a closed set; a [`Token`] pairs a kind with the exact
//! source text it was scanned from, its byte [`Span`], and the 1-indexed
//! [`Position`] of its first character.

use genesis_source::{Position, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TokenKind {
    // === Keywords ===
    /// `function`
    Function,
    /// `imports`
    Imports,
    /// `config`
    Config,
    /// `entrypoints`
    Entrypoints,
    /// `build`
    Build,
    /// `dependencies`
    Dependencies,
    /// `deployment`
    Deployment,
    /// `as`
    As,
    /// `true`
    True,
    /// `false`
    False,

    // === Punctuation ===
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// A line break. Significant: directives and free text end at one.
    Newline,

    // === Literals ===
    /// A double-quoted string; the token text includes the quotes.
    StringLiteral,
    /// An integer or decimal number, optionally negative.
    Number,

    // === Words ===
    /// A word shaped like an identifier (`greet`, `ai_models`, `gpt-4`).
    Identifier,
    /// Any other run of non-structural characters (`user's`, `./lib`, `^4.18`).
    Text,

    // === Markers ===
    /// `@name`, an AI directive marker.
    Directive,
    /// `@question`, an AI question marker.
    Question,

    // === Trivia ===
    /// `// ...` up to the end of the line.
    Comment,
    /// `# ...` at the start of a line.
    MarkdownHeader,

    /// Input the tokenizer could not scan (tolerant mode only).
    Error,
    /// End of input. Always the last token.
    Eof,
}

impl TokenKind {
    /// Returns `true` for reserved words.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Function
                | TokenKind::Imports
                | TokenKind::Config
                | TokenKind::Entrypoints
                | TokenKind::Build
                | TokenKind::Dependencies
                | TokenKind::Deployment
                | TokenKind::As
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Returns `true` for keywords that open a manifest section.
    pub fn is_section_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Imports
                | TokenKind::Config
                | TokenKind::Entrypoints
                | TokenKind::Build
                | TokenKind::Dependencies
                | TokenKind::Deployment
        )
    }

    /// Returns `true` for tokens that can be read as a plain word: identifiers,
    /// free text, and keywords used outside their keyword position.
    pub fn is_word(self) -> bool {
        matches!(self, TokenKind::Identifier | TokenKind::Text) || self.is_keyword()
    }

    /// Returns `true` for tokens the parser never sees.
    pub fn is_trivia(self) -> bool {
        self == TokenKind::Comment
    }

    /// A short description for diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Function => "'function'",
            TokenKind::Imports => "'imports'",
            TokenKind::Config => "'config'",
            TokenKind::Entrypoints => "'entrypoints'",
            TokenKind::Build => "'build'",
            TokenKind::Dependencies => "'dependencies'",
            TokenKind::Deployment => "'deployment'",
            TokenKind::As => "'as'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Newline => "newline",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Number => "number",
            TokenKind::Identifier => "identifier",
            TokenKind::Text => "text",
            TokenKind::Directive => "directive",
            TokenKind::Question => "'@question'",
            TokenKind::Comment => "comment",
            TokenKind::MarkdownHeader => "markdown header",
            TokenKind::Error => "invalid input",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Looks up a reserved word. Keywords are case-sensitive.
pub fn lookup_keyword(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "function" => TokenKind::Function,
        "imports" => TokenKind::Imports,
        "config" => TokenKind::Config,
        "entrypoints" => TokenKind::Entrypoints,
        "build" => TokenKind::Build,
        "dependencies" => TokenKind::Dependencies,
        "deployment" => TokenKind::Deployment,
        "as" => TokenKind::As,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    };
    Some(kind)
}

/// A scanned token. Immutable once produced.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The exact source text of the token.
    pub text: String,
    /// Byte range in the source.
    pub span: Span,
    /// Line/column of the first character.
    pub position: Position,
}

impl Token {
    /// Creates a token.
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            position,
        }
    }

    /// The directive name without the leading `@` (`"project"` for `@project`).
    pub fn directive_name(&self) -> &str {
        self.text.strip_prefix('@').unwrap_or(&self.text)
    }

    /// The value of a string literal with quotes removed and escapes resolved.
    ///
    /// For other tokens this is the token text unchanged.
    pub fn unquoted(&self) -> String {
        if self.kind != TokenKind::StringLiteral {
            return self.text.clone();
        }
        let inner = self.text.strip_prefix('"').unwrap_or(&self.text);
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        out
    }

    /// A quoted rendering of the token for messages (`'{'`, `'greet'`, `end of input`).
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof | TokenKind::Newline => self.kind.describe().to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}
