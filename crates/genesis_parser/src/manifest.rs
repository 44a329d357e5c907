//! Manifest grammar.
//!
//! A manifest is a project descriptor: metadata directives (`@project`,
//! `@version`, ...), free-text description lines, and keyword sections
//! (`imports`, `config`, `entrypoints`, `build`, `dependencies`,
//! `deployment`). Everything may appear in any order. A section keyword is
//! only recognized when directly followed by `{`, so the same words can be
//! used in prose.

use crate::ast::*;
use crate::error::ParseError;
use crate::decl::Entry;
use crate::parser::Parser;
use crate::recovery::SyncScope;
use crate::token::{Token, TokenKind};
use genesis_diagnostics::DiagnosticCode;
use indexmap::IndexMap;

impl Parser<'_> {
    /// Parses a manifest.
    pub fn parse_manifest(mut self) -> GenesisProgram {
        self.push_construct("manifest");
        let mut manifest = GenesisProgram::new(self.file_span());
        let mut description = Vec::new();

        loop {
            self.skip_newlines();
            let start = self.pos;
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::MarkdownHeader => {
                    self.advance();
                }
                TokenKind::Directive | TokenKind::Question => {
                    self.manifest_directive(&mut manifest);
                }
                kind if kind.is_section_keyword() && self.peek_is(TokenKind::LeftBrace) => {
                    if let Err(error) = self.parse_section(&mut manifest) {
                        if let Some(partial) = self.recover_declaration(error) {
                            apply_section(&mut manifest, partial);
                        }
                    }
                }
                kind if kind.is_word()
                    || kind == TokenKind::StringLiteral
                    || kind == TokenKind::Number =>
                {
                    let (text, _) = self.scan_run(&[]);
                    description.push(text);
                }
                _ => {
                    self.unexpected("in manifest");
                    self.advance();
                }
            }
            assert!(self.pos > start, "manifest parser made no progress at token {start}");
        }

        if !description.is_empty() {
            manifest.description = Some(description.join("\n"));
        }
        manifest.metadata = self.finish();
        tracing::debug!(
            project = manifest.name.as_deref().unwrap_or("<unnamed>"),
            imports = manifest.imports.len(),
            errors = manifest.metadata.errors.len(),
            "parsed manifest"
        );
        manifest
    }

    /// Handles one directive line. Metadata directives set manifest fields;
    /// any other directive is kept in the global directive list.
    fn manifest_directive(&mut self, manifest: &mut GenesisProgram) {
        let marker = self.current().clone();
        let directive = self.parse_directive();
        let slot = match directive.name.as_str() {
            "project" => &mut manifest.name,
            "version" => &mut manifest.version,
            "author" => &mut manifest.author,
            "context" => &mut manifest.context,
            "source" | "output" => {
                match directive.text() {
                    Some(path) if !path.is_empty() => {
                        let path = path.to_string();
                        if directive.name == "source" {
                            manifest.source_dir = path;
                        } else {
                            manifest.output_dir = path;
                        }
                    }
                    _ => self.missing_directive_value(&marker, &directive.name),
                }
                return;
            }
            _ => {
                manifest
                    .directives
                    .get_or_insert_with(Vec::new)
                    .push(directive);
                return;
            }
        };
        match directive.text() {
            Some(text) if !text.is_empty() => *slot = Some(text.to_string()),
            _ => self.missing_directive_value(&marker, &directive.name),
        }
    }

    fn missing_directive_value(&mut self, marker: &Token, name: &str) {
        let mut error = self.error_here(
            format!("'@{name}' needs a value"),
            vec![TokenKind::StringLiteral],
            DiagnosticCode::EXPECTED_TOKEN,
        );
        error.offending_token = marker.clone();
        self.report(error);
    }

    /// Parses `keyword { ... }`. The section is applied even when it
    /// contained errors; only an unterminated section is returned as an
    /// error, with the entries read so far stashed as the partial node.
    fn parse_section(&mut self, manifest: &mut GenesisProgram) -> Result<(), ParseError> {
        let keyword = self.advance();
        let open = self.advance();
        self.push_construct(format!("{} section", keyword.text));

        let (node, result) = if keyword.kind == TokenKind::Imports {
            let mut imports = Vec::new();
            let result = self.import_entries(&mut imports);
            (Node::Imports(imports), result)
        } else {
            let mut entries = IndexMap::new();
            let result = self.block_entries(&mut entries);
            (self.section_node(keyword.kind, entries), result)
        };
        self.pop_construct();

        match result {
            Ok(()) => {
                apply_section(manifest, node);
                Ok(())
            }
            Err(error) => Err(self.abandon(error.opened_at(&open), node)),
        }
    }

    /// Parses the entries of `imports { }`: `path [as alias]` per line or
    /// comma-separated. A path is a string literal or a raw run of text.
    fn import_entries(&mut self, imports: &mut Vec<ImportDeclaration>) -> Result<(), ParseError> {
        loop {
            while self.eat(TokenKind::Newline) || self.eat(TokenKind::Comma) {}
            let start = self.pos;
            match self.kind() {
                TokenKind::RightBrace => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Eof => {
                    return Err(self.error_here(
                        "unterminated imports section",
                        vec![TokenKind::RightBrace],
                        DiagnosticCode::UNTERMINATED_BLOCK,
                    ));
                }
                kind if kind.is_word()
                    || kind == TokenKind::StringLiteral
                    || kind == TokenKind::Number =>
                {
                    let (path, mut span) = if kind == TokenKind::StringLiteral
                        && self.value_ends_at(1, &[TokenKind::As])
                    {
                        let token = self.advance();
                        (token.unquoted(), token.span)
                    } else {
                        self.scan_run(&[TokenKind::As, TokenKind::Comma])
                    };
                    let mut alias = None;
                    if self.eat(TokenKind::As) {
                        if self.kind().is_word() {
                            let token = self.advance();
                            span = span.merge(token.span);
                            alias = Some(token.text);
                        } else {
                            let error = self.error_here(
                                format!("expected an alias after 'as' for '{path}'"),
                                vec![TokenKind::Identifier],
                                DiagnosticCode::EXPECTED_TOKEN,
                            );
                            self.synchronize(error, SyncScope::Line);
                        }
                    }
                    imports.push(ImportDeclaration { path, alias, span });
                }
                _ => {
                    self.unexpected("in imports section");
                    self.advance();
                }
            }
            if !self.at_line_end() && !self.check(TokenKind::Comma) {
                self.unexpected("after import");
                self.scan_run(&[TokenKind::Comma]);
            }
            self.ensure_progress(start);
        }
    }

    /// Converts the raw entries of a keyword section into its tree node.
    fn section_node(&mut self, keyword: TokenKind, entries: IndexMap<String, Entry>) -> Node {
        match keyword {
            TokenKind::Config => Node::Config(ConfigBlock {
                settings: entry_values(entries),
            }),
            TokenKind::Entrypoints => Node::Entrypoints(
                entries
                    .into_iter()
                    .map(|(name, entry)| EntrypointDeclaration {
                        name,
                        target: entry.value.to_string(),
                        span: entry.span,
                    })
                    .collect(),
            ),
            TokenKind::Build => {
                let mut build = BuildConfig::default();
                for (key, value) in entry_values(entries) {
                    if key == "targets" {
                        build.targets = match value {
                            Value::List(items) => items.iter().map(Value::to_string).collect(),
                            single => vec![single.to_string()],
                        };
                    } else {
                        build.options.insert(key, value);
                    }
                }
                Node::Build(build)
            }
            TokenKind::Dependencies => {
                let mut deps = DependencyDeclaration::default();
                for (key, value) in entry_values(entries) {
                    match (key.as_str(), value) {
                        ("external", Value::Map(map)) => deps.external = Some(map),
                        ("ai_models", Value::Map(map)) => deps.ai_models = Some(map),
                        (_, value) => {
                            deps.other.insert(key, value);
                        }
                    }
                }
                Node::Dependencies(deps)
            }
            // deployment
            _ => {
                let mut deployment = DeploymentConfig::default();
                for (name, entry) in entries {
                    match entry.value {
                        Value::Map(settings) => {
                            deployment
                                .environments
                                .insert(name.clone(), Environment { name, settings });
                        }
                        _ => {
                            let mut error = self.error_here(
                                format!("deployment environment '{name}' must be a block"),
                                vec![TokenKind::LeftBrace],
                                DiagnosticCode::EXPECTED_TOKEN,
                            );
                            error.offending_token = entry.key;
                            self.report(error);
                        }
                    }
                }
                Node::Deployment(deployment)
            }
        }
    }
}

fn entry_values(entries: IndexMap<String, Entry>) -> IndexMap<String, Value> {
    entries.into_iter().map(|(k, e)| (k, e.value)).collect()
}

/// Stores a parsed (or partially parsed) section in the manifest.
fn apply_section(manifest: &mut GenesisProgram, node: Node) {
    match node {
        Node::Imports(imports) => manifest.imports.extend(imports),
        Node::Config(config) => match &mut manifest.config {
            Some(existing) => existing.settings.extend(config.settings),
            None => manifest.config = Some(config),
        },
        Node::Entrypoints(entries) => manifest
            .entrypoints
            .get_or_insert_with(Vec::new)
            .extend(entries),
        Node::Build(build) => manifest.build = Some(build),
        Node::Dependencies(deps) => manifest.dependencies = Some(deps),
        Node::Deployment(deployment) => manifest.deployment = Some(deployment),
        _ => {}
    }
}
