//! Error-tolerant tokenizer and recursive descent parser for Genesis source
//! files and project manifests.
//!
//! The parser never fails on bad input. Syntax errors are recorded in the
//! tree's metadata and the parser resumes at a safe point, so every
//! well-formed declaration in a file still reaches the code generator.
//!
//! # Architecture
//!
//! - **Lexer** ([`lexer`]): source text to tokens, with a tolerant mode that
//!   turns unscannable input into error tokens.
//! - **Parser** ([`parser`]): token primitives, diagnostic context, and the
//!   top-level program rule. Function and directive rules live in `decl.rs`,
//!   the manifest grammar in `manifest.rs`.
//! - **Recovery** ([`recovery`]): the synchronization engine that picks
//!   resumption points and keeps the error log.
//! - **AST** ([`ast`]): tree types with spans and serde support.

#![warn(missing_docs)]

pub mod ast;
mod decl;
pub mod error;
pub mod lexer;
mod manifest;
pub mod parser;
pub mod recovery;
pub mod token;

pub use ast::{GenesisProgram, Program, Value};
pub use decl::{MAX_NESTING, UNKNOWN_FUNCTION};
pub use error::{ParseContext, ParseError};
pub use lexer::{tokenize, LexMode};
pub use parser::{ParseOptions, Parser};
pub use recovery::{RecoveryResult, SyncEngine, SyncScope};
pub use token::{Token, TokenKind};

use genesis_diagnostics::{Category, DiagnosticSink};
use genesis_source::{FileId, SourceDb};

/// Parses a source string with default options.
///
/// Tokenizer diagnostics are kept in the tree alongside the parse errors.
pub fn parse_source(source: &str) -> Program {
    parse_source_with(source, &ParseOptions::default())
}

/// Parses a source string.
pub fn parse_source_with(source: &str, options: &ParseOptions) -> Program {
    parser(source, FileId::ANONYMOUS, options, None).parse_program()
}

/// Parses a manifest string with default options.
pub fn parse_manifest_source(source: &str) -> GenesisProgram {
    parser(source, FileId::ANONYMOUS, &ParseOptions::default(), None).parse_manifest()
}

/// Parses a loaded source file.
///
/// Tokenizer diagnostics and parse errors are reported to `sink`; both are
/// also kept in the returned tree.
pub fn parse_file(
    file_id: FileId,
    source_db: &SourceDb,
    sink: &DiagnosticSink,
    options: &ParseOptions,
) -> Program {
    let source = &source_db.get_file(file_id).content;
    let program = parser(source, file_id, options, Some(sink)).parse_program();
    report_errors(&program.metadata.errors, sink);
    program
}

/// Parses a loaded manifest file, reporting to `sink` like [`parse_file`].
pub fn parse_manifest_file(
    file_id: FileId,
    source_db: &SourceDb,
    sink: &DiagnosticSink,
    options: &ParseOptions,
) -> GenesisProgram {
    let source = &source_db.get_file(file_id).content;
    let manifest = parser(source, file_id, options, Some(sink)).parse_manifest();
    report_errors(&manifest.metadata.errors, sink);
    manifest
}

/// Tokenizes `source` and sets up a parser that carries the tokenizer's
/// diagnostics into its tree. They are also forwarded to `sink`, if given.
fn parser<'src>(
    source: &'src str,
    file: FileId,
    options: &ParseOptions,
    sink: Option<&DiagnosticSink>,
) -> Parser<'src> {
    let lexer_sink = DiagnosticSink::new();
    let tokens = lexer::lex(source, file, &lexer_sink, options.lex_mode);
    let lexical = lexer_sink.take_all();
    if let Some(sink) = sink {
        sink.extend(lexical.iter().cloned());
    }
    Parser::new(tokens, source, file, options.clone()).with_lexical_errors(&lexical)
}

/// Tokenizer errors went to the sink straight from the tokenizer.
fn report_errors(errors: &[ParseError], sink: &DiagnosticSink) {
    sink.extend(
        errors
            .iter()
            .filter(|e| e.code.category != Category::Lexical)
            .map(ParseError::to_diagnostic),
    );
}
