//! File- and element-level change detection against the compilation cache.
//!
//! A candidate file is compared by the SHA-256 of its bytes. Files whose
//! hash changed (or that are new) are rescanned for declarations, and the
//! declarations are diffed by name and hash against the cached ones. Cached
//! files missing from the candidate list are reported deleted together with
//! every element they held.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use genesis_common::ContentHash;
use genesis_config::CacheSection;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, CompilationCache, ElementMetadata, FileMetadata};
use crate::error::CacheError;
use crate::extract::{extract_imports, ElementExtractor};

/// How a file or element changed since the last build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    /// Not present in the cache.
    Added,
    /// Present with a different hash.
    Modified,
    /// Present in the cache but gone now.
    Deleted,
}

/// A changed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// The file's path as passed to the detector.
    pub file_path: PathBuf,
    /// What happened to the file.
    pub change_type: ChangeType,
    /// Detection time in epoch milliseconds.
    pub timestamp: i64,
    /// Current content hash; for a deleted file, the last cached one.
    pub content_hash: ContentHash,
    /// Declarations that were added, modified or deleted within the file.
    pub changed_elements: Vec<ElementChange>,
}

/// A changed declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementChange {
    /// Declaration keyword.
    pub kind: String,
    /// Declared name.
    pub name: String,
    /// What happened to the declaration.
    pub change_type: ChangeType,
    /// 1-indexed header line.
    pub start_line: usize,
    /// 1-indexed last line, inclusive.
    pub end_line: usize,
    /// Cached hash, for modified declarations.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub old_hash: Option<ContentHash>,
    /// Current hash; for a deleted declaration, the last cached one.
    pub new_hash: ContentHash,
    /// Names the declaration refers to.
    pub dependencies: Vec<String>,
}

impl ElementChange {
    fn from_element(element: &ElementMetadata, change_type: ChangeType) -> Self {
        Self {
            kind: element.kind.clone(),
            name: element.name.clone(),
            change_type,
            start_line: element.start_line,
            end_line: element.end_line,
            old_hash: None,
            new_hash: element.content_hash,
            dependencies: element.dependencies.clone(),
        }
    }
}

/// The result of one change detection pass, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Every changed file. Unchanged files are not listed.
    pub changes: Vec<FileChange>,
}

impl ChangeSet {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed files.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates over the changed files.
    pub fn iter(&self) -> impl Iterator<Item = &FileChange> {
        self.changes.iter()
    }

    fn of_type(&self, change_type: ChangeType) -> impl Iterator<Item = &FileChange> {
        self.changes
            .iter()
            .filter(move |c| c.change_type == change_type)
    }

    /// Files that are new since the last build.
    pub fn added(&self) -> impl Iterator<Item = &FileChange> {
        self.of_type(ChangeType::Added)
    }

    /// Files whose content changed.
    pub fn modified(&self) -> impl Iterator<Item = &FileChange> {
        self.of_type(ChangeType::Modified)
    }

    /// Files that disappeared.
    pub fn deleted(&self) -> impl Iterator<Item = &FileChange> {
        self.of_type(ChangeType::Deleted)
    }

    /// Files that exist and must be reprocessed (added or modified).
    pub fn dirty_paths(&self) -> Vec<PathBuf> {
        self.changes
            .iter()
            .filter(|c| c.change_type != ChangeType::Deleted)
            .map(|c| c.file_path.clone())
            .collect()
    }

    /// The dirty paths plus every other cached file that depends on a
    /// changed element. Only direct dependents are included.
    pub fn affected_files(&self, detector: &ChangeDetector) -> BTreeSet<PathBuf> {
        let deleted: BTreeSet<&Path> = self.deleted().map(|c| c.file_path.as_path()).collect();
        let mut affected: BTreeSet<PathBuf> = self.dirty_paths().into_iter().collect();
        for change in &self.changes {
            for element in &change.changed_elements {
                affected.extend(
                    detector
                        .find_dependents(&element.name, &change.file_path)
                        .into_iter()
                        .filter(|p| !deleted.contains(p.as_path())),
                );
            }
        }
        affected
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FileChange;
    type IntoIter = std::slice::Iter<'a, FileChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Settings for a [`ChangeDetector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Where the cache file lives.
    pub cache_path: PathBuf,
    /// Keywords that introduce a tracked declaration.
    pub declaration_keywords: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::from(&CacheSection::default())
    }
}

impl From<&CacheSection> for DetectorConfig {
    fn from(section: &CacheSection) -> Self {
        Self {
            cache_path: section.path.clone(),
            declaration_keywords: section.declaration_keywords.clone(),
        }
    }
}

impl DetectorConfig {
    /// Resolves a relative cache path against the project root.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        if self.cache_path.is_relative() {
            self.cache_path = root.join(&self.cache_path);
        }
        self
    }
}

/// Owns the compilation cache for one incremental build.
///
/// The expected cycle is: [`new`](Self::new) (loads the cache),
/// [`detect_changes`](Self::detect_changes), reprocess the dirty files and
/// record them with [`update_cache`](Self::update_cache) or
/// [`apply`](Self::apply), then [`save`](Self::save).
#[derive(Debug)]
pub struct ChangeDetector {
    config: DetectorConfig,
    cache: CompilationCache,
    extractor: ElementExtractor,
}

impl ChangeDetector {
    /// Creates a detector, loading the cache from `config.cache_path`.
    pub fn new(config: DetectorConfig) -> Self {
        let cache = CompilationCache::load(&config.cache_path);
        Self::with_cache(config, cache)
    }

    /// Creates a detector over an already loaded cache.
    pub fn with_cache(config: DetectorConfig, cache: CompilationCache) -> Self {
        let extractor = ElementExtractor::new(config.declaration_keywords.iter().cloned());
        Self {
            config,
            cache,
            extractor,
        }
    }

    /// The cache as currently held in memory.
    pub fn cache(&self) -> &CompilationCache {
        &self.cache
    }

    /// Scans source text for declarations.
    pub fn extract_elements(&self, content: &str) -> BTreeMap<String, ElementMetadata> {
        self.extractor.extract(content)
    }

    /// Compares `paths` against the cache.
    ///
    /// Unreadable candidates are logged and skipped, so a file that was
    /// cached but can no longer be read is reported as deleted. Listing a
    /// path twice has no further effect.
    #[tracing::instrument(level = "debug", skip_all, fields(candidates = paths.len()))]
    pub fn detect_changes(&self, paths: &[PathBuf]) -> ChangeSet {
        let now = Utc::now().timestamp_millis();
        let mut seen = BTreeSet::new();
        let mut changes = Vec::new();

        for path in paths {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable source");
                    continue;
                }
            };
            if !seen.insert(path.as_path()) {
                continue;
            }
            let hash = ContentHash::from_bytes(&bytes);
            let cached = self.cache.file(path);
            let change_type = match cached {
                None => ChangeType::Added,
                Some(meta) if meta.content_hash == hash => {
                    tracing::trace!(path = %path.display(), "unchanged");
                    continue;
                }
                Some(_) => ChangeType::Modified,
            };

            let text = String::from_utf8_lossy(&bytes);
            let elements = self.extractor.extract(&text);
            let changed_elements = diff_elements(cached, &elements);
            tracing::trace!(
                path = %path.display(),
                ?change_type,
                elements = changed_elements.len(),
                "file changed"
            );
            changes.push(FileChange {
                file_path: path.clone(),
                change_type,
                timestamp: now,
                content_hash: hash,
                changed_elements,
            });
        }

        for (path, meta) in &self.cache.files {
            if seen.contains(path.as_path()) {
                continue;
            }
            changes.push(FileChange {
                file_path: path.clone(),
                change_type: ChangeType::Deleted,
                timestamp: now,
                content_hash: meta.content_hash,
                changed_elements: meta
                    .elements
                    .values()
                    .map(|e| ElementChange::from_element(e, ChangeType::Deleted))
                    .collect(),
            });
        }

        changes.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        let set = ChangeSet { changes };
        tracing::debug!(
            added = set.added().count(),
            modified = set.modified().count(),
            deleted = set.deleted().count(),
            "change detection finished"
        );
        set
    }

    /// Cached files, other than `defining_file`, holding an element whose
    /// dependency list names `name`.
    pub fn find_dependents(&self, name: &str, defining_file: &Path) -> BTreeSet<PathBuf> {
        self.cache
            .files
            .iter()
            .filter(|(path, _)| path.as_path() != defining_file)
            .filter(|(_, meta)| {
                meta.elements
                    .values()
                    .any(|e| e.dependencies.iter().any(|d| d == name))
            })
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Records `path` as processed with the given elements.
    ///
    /// Rereads the file to refresh its hash, modification time and imports,
    /// replaces its cache entry, and updates the dependency map.
    pub fn update_cache(
        &mut self,
        path: &Path,
        elements: BTreeMap<String, ElementMetadata>,
    ) -> Result<(), CacheError> {
        let io_error = |e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let bytes = std::fs::read(path).map_err(io_error)?;
        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or_else(|_| Utc::now().timestamp_millis());
        let text = String::from_utf8_lossy(&bytes);

        if let Some(old) = self.cache.files.remove(path) {
            for name in old.elements.keys() {
                if !elements.contains_key(name) && !self.cache.defines(name) {
                    self.cache.dependencies.remove(name);
                }
            }
        }
        for element in elements.values() {
            self.cache
                .dependencies
                .insert(element.name.clone(), element.dependencies.clone());
        }

        let metadata = FileMetadata {
            path: path.to_path_buf(),
            content_hash: ContentHash::from_bytes(&bytes),
            last_modified,
            imports: extract_imports(&text),
            exports: elements.keys().cloned().collect(),
            elements,
        };
        tracing::trace!(path = %path.display(), elements = metadata.elements.len(), "cache updated");
        self.cache.files.insert(path.to_path_buf(), metadata);
        Ok(())
    }

    /// Brings the cache in line with `changes`: dirty files are rescanned
    /// and recorded, deleted files are forgotten.
    ///
    /// Output files recorded for an element survive as long as the element
    /// keeps its name.
    pub fn apply(&mut self, changes: &ChangeSet) -> Result<(), CacheError> {
        for change in changes {
            if change.change_type == ChangeType::Deleted {
                self.remove_file(&change.file_path);
                continue;
            }
            let text = std::fs::read_to_string(&change.file_path).map_err(|e| CacheError::Io {
                path: change.file_path.clone(),
                source: e,
            })?;
            let mut elements = self.extractor.extract(&text);
            if let Some(old) = self.cache.file(&change.file_path) {
                for (name, element) in &mut elements {
                    if let Some(previous) = old.elements.get(name) {
                        element.output_files = previous.output_files.clone();
                    }
                }
            }
            self.update_cache(&change.file_path, elements)?;
        }
        Ok(())
    }

    /// Forgets a file.
    pub fn remove_file(&mut self, path: &Path) -> Option<FileMetadata> {
        self.cache.remove_file(path)
    }

    /// Forgets everything; the next detection reports every file as added.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Counts tracked files and elements.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Stamps the build time and writes the cache to `config.cache_path`.
    pub fn save(&mut self) -> Result<(), CacheError> {
        self.cache.last_build_timestamp = Utc::now().timestamp_millis();
        self.cache.save(&self.config.cache_path)
    }
}

/// Element-level diff of a rescanned file against its cached elements.
fn diff_elements(
    cached: Option<&FileMetadata>,
    current: &BTreeMap<String, ElementMetadata>,
) -> Vec<ElementChange> {
    let empty = BTreeMap::new();
    let old = cached.map_or(&empty, |m| &m.elements);
    let mut changes = Vec::new();

    for (name, element) in current {
        match old.get(name) {
            None => changes.push(ElementChange::from_element(element, ChangeType::Added)),
            Some(previous) if previous.content_hash != element.content_hash => {
                let mut change = ElementChange::from_element(element, ChangeType::Modified);
                change.old_hash = Some(previous.content_hash);
                changes.push(change);
            }
            Some(_) => {}
        }
    }
    for (name, previous) in old {
        if !current.contains_key(name) {
            changes.push(ElementChange::from_element(previous, ChangeType::Deleted));
        }
    }
    changes
}
