//! Tree types for Genesis source files and manifests.
//!
//! Nodes own their children and never point back to their parent. Every node
//! carries a [`Span`]; nodes synthesized during error recovery use
//! [`Span::DUMMY`].

use crate::error::ParseError;
use genesis_source::Span;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default source directory when a manifest has no `@source` directive.
pub const DEFAULT_SOURCE_DIR: &str = "./src";
/// Default output directory when a manifest has no `@output` directive.
pub const DEFAULT_OUTPUT_DIR: &str = "./dist";

/// The root of a parsed source file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Program {
    /// Top-level declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Diagnostics collected while parsing.
    pub metadata: ProgramMetadata,
    /// Span of the whole file.
    pub span: Span,
}

impl Program {
    /// Iterates over the function declarations.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDeclaration> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Function(f) => Some(f),
            Declaration::Directive(_) => None,
        })
    }

    /// Iterates over the top-level directives.
    pub fn directives(&self) -> impl Iterator<Item = &AiDirective> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Directive(dir) => Some(dir),
            Declaration::Function(_) => None,
        })
    }

    /// Finds a function by name.
    pub fn function(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.functions().find(|f| f.name == name)
    }

    /// Returns `true` if any diagnostics were recorded.
    pub fn has_errors(&self) -> bool {
        !self.metadata.errors.is_empty()
    }
}

/// Metadata attached to a root node.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProgramMetadata {
    /// Every parse error, ordered by source position.
    pub errors: Vec<ParseError>,
    /// Set when errors past the configured limit were dropped.
    pub error_limit_reached: bool,
}

/// A top-level declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Declaration {
    /// `function name { ... }`
    Function(FunctionDeclaration),
    /// `@name ...` outside any function.
    Directive(AiDirective),
}

impl Declaration {
    /// The source span of the declaration.
    pub fn span(&self) -> Span {
        match self {
            Declaration::Function(f) => f.span,
            Declaration::Directive(d) => d.span,
        }
    }
}

/// A function: a name and a body of natural-language statements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// The function name, or `"unknown"` when it was missing.
    pub name: String,
    /// Body statements in source order.
    pub body: Vec<Statement>,
    /// Questions, directives, and error state.
    pub metadata: FunctionMetadata,
    /// Source span.
    pub span: Span,
}

/// Summary information about a function body.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// The text of each `@question` in the body.
    pub ai_questions: Vec<String>,
    /// Names of the other directives in the body.
    pub directives: Vec<String>,
    /// Set when the body had syntax errors.
    pub has_errors: bool,
}

/// A statement in a function body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Statement {
    /// A free-text line.
    NaturalLanguage(NaturalLanguageExpression),
    /// A directive or `@question`.
    Directive(AiDirective),
}

/// A line of prose, kept verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NaturalLanguageExpression {
    /// The raw text with surrounding whitespace trimmed.
    pub text: String,
    /// Source span.
    pub span: Span,
}

/// An `@name` directive and its parameters.
///
/// `@name key: value, other: value` yields named parameters. Anything else
/// after the marker becomes a single `text` parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiDirective {
    /// The directive name without `@`.
    pub name: String,
    /// Parameters in source order.
    pub parameters: IndexMap<String, Value>,
    /// Source span.
    pub span: Span,
}

impl AiDirective {
    /// The positional text of the directive, if it has one.
    pub fn text(&self) -> Option<&str> {
        self.parameters.get("text").and_then(Value::as_str)
    }
}

/// A parameter or configuration value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean literal.
    Bool(bool),
    /// A numeric literal.
    Number(f64),
    /// A string literal or a raw run of text.
    String(String),
    /// `[a, b, c]`
    List(Vec<Value>),
    /// `{ key: value ... }`
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Returns the string if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is a map.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// The root of a parsed manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisProgram {
    /// `@project`
    pub name: Option<String>,
    /// `@version`
    pub version: Option<String>,
    /// `@author`
    pub author: Option<String>,
    /// `@context`
    pub context: Option<String>,
    /// `@source`, defaulting to `./src`.
    pub source_dir: String,
    /// `@output`, defaulting to `./dist`.
    pub output_dir: String,
    /// Free-text lines outside any section, joined with newlines.
    pub description: Option<String>,
    /// `imports { ... }` entries in source order.
    pub imports: Vec<ImportDeclaration>,
    /// `config { ... }`
    pub config: Option<ConfigBlock>,
    /// `entrypoints { ... }`
    pub entrypoints: Option<Vec<EntrypointDeclaration>>,
    /// `build { ... }`
    pub build: Option<BuildConfig>,
    /// `dependencies { ... }`
    pub dependencies: Option<DependencyDeclaration>,
    /// `deployment { ... }`
    pub deployment: Option<DeploymentConfig>,
    /// Directives other than the recognized metadata ones.
    pub directives: Option<Vec<AiDirective>>,
    /// Diagnostics collected while parsing.
    pub metadata: ProgramMetadata,
    /// Span of the whole file.
    pub span: Span,
}

impl GenesisProgram {
    /// Creates an empty manifest with default directories.
    pub fn new(span: Span) -> Self {
        Self {
            name: None,
            version: None,
            author: None,
            context: None,
            source_dir: DEFAULT_SOURCE_DIR.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            description: None,
            imports: Vec::new(),
            config: None,
            entrypoints: None,
            build: None,
            dependencies: None,
            deployment: None,
            directives: None,
            metadata: ProgramMetadata::default(),
            span,
        }
    }

    /// Looks up a `config` setting.
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.as_ref()?.settings.get(key)
    }

    /// Looks up a deployment environment by name.
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.deployment.as_ref()?.environments.get(name)
    }

    /// Returns `true` if any diagnostics were recorded.
    pub fn has_errors(&self) -> bool {
        !self.metadata.errors.is_empty()
    }
}

/// `path [as alias]` inside `imports { }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportDeclaration {
    /// The imported path or module name.
    pub path: String,
    /// Optional local name.
    pub alias: Option<String>,
    /// Source span.
    pub span: Span,
}

/// `config { key: value ... }`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigBlock {
    /// Settings in source order.
    pub settings: IndexMap<String, Value>,
}

/// `name: target` inside `entrypoints { }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntrypointDeclaration {
    /// Entrypoint name.
    pub name: String,
    /// File or function it points at.
    pub target: String,
    /// Source span.
    pub span: Span,
}

/// `build { targets: [...], key: value ... }`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Target names.
    pub targets: Vec<String>,
    /// Every other build option.
    pub options: IndexMap<String, Value>,
}

/// `dependencies { external { ... } ai_models { ... } }`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    /// Package name to version requirement.
    pub external: Option<IndexMap<String, Value>>,
    /// Model role to model settings.
    pub ai_models: Option<IndexMap<String, Value>>,
    /// Any other entries.
    pub other: IndexMap<String, Value>,
}

/// `deployment { env { ... } ... }`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Environments by name, in source order.
    pub environments: IndexMap<String, Environment>,
}

/// One deployment environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Environment {
    /// Environment name.
    pub name: String,
    /// Settings in source order.
    pub settings: IndexMap<String, Value>,
}

/// Any tree node. Used to carry partially parsed declarations out of error
/// recovery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Node {
    /// A source file root.
    Program(Box<Program>),
    /// A function declaration.
    Function(FunctionDeclaration),
    /// A directive.
    Directive(AiDirective),
    /// A free-text line.
    NaturalLanguage(NaturalLanguageExpression),
    /// A manifest root.
    Manifest(Box<GenesisProgram>),
    /// The entries of an imports section.
    Imports(Vec<ImportDeclaration>),
    /// A config block.
    Config(ConfigBlock),
    /// The entries of an entrypoints section.
    Entrypoints(Vec<EntrypointDeclaration>),
    /// A build block.
    Build(BuildConfig),
    /// A dependencies block.
    Dependencies(DependencyDeclaration),
    /// A deployment block.
    Deployment(DeploymentConfig),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(name: &str, params: &[(&str, Value)]) -> AiDirective {
        AiDirective {
            name: name.to_string(),
            parameters: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            span: Span::DUMMY,
        }
    }

    #[test]
    fn program_accessors() {
        let program = Program {
            declarations: vec![
                Declaration::Directive(directive("context", &[])),
                Declaration::Function(FunctionDeclaration {
                    name: "greet".into(),
                    body: vec![],
                    metadata: FunctionMetadata::default(),
                    span: Span::DUMMY,
                }),
            ],
            metadata: ProgramMetadata::default(),
            span: Span::DUMMY,
        };
        assert_eq!(program.functions().count(), 1);
        assert_eq!(program.directives().count(), 1);
        assert!(program.function("greet").is_some());
        assert!(program.function("missing").is_none());
        assert!(!program.has_errors());
    }

    #[test]
    fn directive_text() {
        let d = directive("context", &[("text", Value::String("web app".into()))]);
        assert_eq!(d.text(), Some("web app"));
        assert_eq!(directive("x", &[]).text(), None);
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Number(3.0).as_number(), Some(3.0));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::String("a".into()).as_str(), Some("a"));
        assert!(Value::String("a".into()).as_number().is_none());
        let list = Value::List(vec![Value::Bool(false)]);
        assert_eq!(list.as_list().map(<[Value]>::len), Some(1));
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::String("app.js".into()).to_string(), "app.js");
        let list = Value::List(vec![Value::String("web".into()), Value::Bool(true)]);
        assert_eq!(list.to_string(), "[web, true]");
    }

    #[test]
    fn manifest_defaults() {
        let m = GenesisProgram::new(Span::DUMMY);
        assert_eq!(m.source_dir, DEFAULT_SOURCE_DIR);
        assert_eq!(m.output_dir, DEFAULT_OUTPUT_DIR);
        assert!(m.config_value("port").is_none());
        assert!(m.environment("prod").is_none());
    }

    #[test]
    fn value_serializes_untagged() {
        let mut map = IndexMap::new();
        map.insert("port".to_string(), Value::Number(8080.0));
        map.insert("debug".to_string(), Value::Bool(false));
        let json = serde_json::to_string(&Value::Map(map)).unwrap();
        assert_eq!(json, r#"{"port":8080.0,"debug":false}"#);
    }
}
