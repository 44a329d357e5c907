//! Configuration types deserialized from `genesis.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Project layout.
    pub project: ProjectSection,
    /// Tokenizer and parser behaviour.
    pub parser: ParserSection,
    /// Incremental build cache.
    pub cache: CacheSection,
}

/// `[project]`: where sources live and which files count as sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Directory scanned for source files.
    pub source_dir: PathBuf,
    /// Directory generated code is written to.
    pub output_dir: PathBuf,
    /// File extensions (without the dot) considered source files.
    pub extensions: Vec<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("./src"),
            output_dir: PathBuf::from("./dist"),
            extensions: vec!["gen".to_string()],
        }
    }
}

/// `[parser]`: tokenizer tolerance and diagnostic limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserSection {
    /// Emit error tokens for unscannable input instead of stopping.
    pub tolerant: bool,
    /// Stop recording diagnostics after this many.
    pub max_errors: usize,
    /// Tokens captured on each side of an error for context.
    pub nearby_tokens: usize,
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            tolerant: true,
            max_errors: 100,
            nearby_tokens: 2,
        }
    }
}

/// `[cache]`: location of the snapshot and how declarations are found.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Cache file path, relative to the project root.
    pub path: PathBuf,
    /// Keywords that introduce a tracked declaration at the start of a line.
    pub declaration_keywords: Vec<String>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".genesis/cache.json"),
            declaration_keywords: ["function", "component", "class", "interface", "type"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
