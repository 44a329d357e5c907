//! The persisted compilation cache.
//!
//! One JSON document records, per source file, the content hash seen at the
//! last build and the declarations ("elements") found in it. In memory the
//! maps are ordinary `BTreeMap`s; on disk every map is written as an ordered
//! list of `[key, value]` pairs so the text format does not depend on key
//! types being strings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use genesis_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Cache format version. A cache file written with any other version is
/// discarded on load.
pub const CACHE_VERSION: &str = "1.0.0";

/// Everything the change detector remembers between builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationCache {
    /// Format version that wrote this cache.
    pub version: String,
    /// Per-file state, keyed by the path the file was detected under.
    #[serde(with = "pairs")]
    pub files: BTreeMap<PathBuf, FileMetadata>,
    /// Element name to the names that element refers to.
    #[serde(with = "pairs")]
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Epoch milliseconds of the last successful save, `0` if never built.
    pub last_build_timestamp: i64,
}

/// Cached state for one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// The file's path.
    pub path: PathBuf,
    /// SHA-256 of the file's raw bytes.
    pub content_hash: ContentHash,
    /// File modification time in epoch milliseconds.
    #[serde(rename = "lastModifiedTimestamp")]
    pub last_modified: i64,
    /// Declarations found in the file, by name.
    #[serde(with = "pairs")]
    pub elements: BTreeMap<String, ElementMetadata>,
    /// Import paths the file declares.
    pub imports: Vec<String>,
    /// Names the file makes available (its element names).
    pub exports: Vec<String>,
}

/// One declaration inside a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMetadata {
    /// Declared name.
    pub name: String,
    /// The keyword that introduced the declaration (`function`, `class`, ...).
    pub kind: String,
    /// SHA-256 of the declaration's trimmed text.
    pub content_hash: ContentHash,
    /// 1-indexed line of the declaration header.
    pub start_line: usize,
    /// 1-indexed last line of the declaration, inclusive.
    pub end_line: usize,
    /// Names this declaration appears to refer to.
    pub dependencies: Vec<String>,
    /// Files the generator produced from this declaration.
    pub output_files: Vec<String>,
}

/// Summary counts for a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of tracked files.
    pub files: usize,
    /// Number of tracked elements across all files.
    pub elements: usize,
    /// When the cache was last saved by a build, if ever.
    pub last_build: Option<DateTime<Utc>>,
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationCache {
    /// Creates an empty cache at the current format version.
    pub fn new() -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            files: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            last_build_timestamp: 0,
        }
    }

    /// Reads a cache file, reporting every failure.
    pub fn read(path: &Path) -> Result<Self, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| CacheError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if version != CACHE_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                expected: CACHE_VERSION.to_string(),
                actual: version.to_string(),
            });
        }
        serde_json::from_value(value).map_err(|e| CacheError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Loads a cache file, falling back to an empty cache.
    ///
    /// This never fails: a missing file is a first build, and an unreadable,
    /// corrupt or outdated file is logged and treated the same way, which
    /// makes the next change detection report everything as added.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(cache) => {
                tracing::debug!(
                    path = %path.display(),
                    files = cache.files.len(),
                    "loaded compilation cache"
                );
                cache
            }
            Err(CacheError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no compilation cache, starting cold");
                Self::new()
            }
            Err(error) => {
                tracing::warn!(%error, "discarding compilation cache");
                Self::new()
            }
        }
    }

    /// Writes the cache as one snapshot.
    ///
    /// The document goes to a sibling `.tmp` file first and is renamed over
    /// `path`, so a reader never sees a half-written cache. Parent
    /// directories are created as needed.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), files = self.files.len(), "saved compilation cache");
        Ok(())
    }

    /// Returns `true` if this cache was written by the current format version.
    pub fn is_compatible(&self) -> bool {
        self.version == CACHE_VERSION
    }

    /// Returns the cached state for `path`.
    pub fn file(&self, path: &Path) -> Option<&FileMetadata> {
        self.files.get(path)
    }

    /// Forgets a file and the dependency entries of elements only it defined.
    pub fn remove_file(&mut self, path: &Path) -> Option<FileMetadata> {
        let removed = self.files.remove(path)?;
        for name in removed.elements.keys() {
            if !self.defines(name) {
                self.dependencies.remove(name);
            }
        }
        Some(removed)
    }

    /// Forgets everything, keeping the format version.
    pub fn clear(&mut self) {
        self.files.clear();
        self.dependencies.clear();
        self.last_build_timestamp = 0;
    }

    /// Returns `true` if any tracked file declares an element called `name`.
    pub fn defines(&self, name: &str) -> bool {
        self.files.values().any(|f| f.elements.contains_key(name))
    }

    /// Counts tracked files and elements.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            files: self.files.len(),
            elements: self.files.values().map(|f| f.elements.len()).sum(),
            last_build: if self.last_build_timestamp > 0 {
                DateTime::<Utc>::from_timestamp_millis(self.last_build_timestamp)
            } else {
                None
            },
        }
    }
}

/// Serializes a map as an ordered sequence of `[key, value]` pairs.
mod pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
