//! Incremental build support for the Genesis compiler.
//!
//! Decides, per file and per declaration, what changed since the last build
//! so only affected work is redone.
//!
//! # Architecture
//!
//! - [`cache`]: the persisted [`CompilationCache`] (JSON, maps written as
//!   ordered pair lists, atomic replace on save, cold start on any load
//!   failure)
//! - [`extract`]: line-based declaration scanning, extents by brace balance,
//!   naive dependency and import extraction
//! - [`detector`]: the [`ChangeDetector`], which diffs candidate files
//!   against the cache and keeps the cache up to date
//! - [`discover`]: walks a project's source tree for candidate files
//!
//! A typical build:
//!
//! ```no_run
//! use genesis_cache::{discover_project, ChangeDetector, DetectorConfig};
//! use genesis_config::ProjectSection;
//! # fn main() -> Result<(), genesis_cache::CacheError> {
//! let root = std::path::Path::new(".");
//! let mut detector = ChangeDetector::new(DetectorConfig::default().rooted_at(root));
//! let files = discover_project(root, &ProjectSection::default())?;
//! let changes = detector.detect_changes(&files);
//! for path in changes.affected_files(&detector) {
//!     // regenerate `path`
//!     let _ = path;
//! }
//! detector.apply(&changes)?;
//! detector.save()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod detector;
pub mod discover;
pub mod error;
pub mod extract;

pub use cache::{CacheStats, CompilationCache, ElementMetadata, FileMetadata, CACHE_VERSION};
pub use detector::{
    ChangeDetector, ChangeSet, ChangeType, DetectorConfig, ElementChange, FileChange,
};
pub use discover::{discover_project, discover_sources};
pub use error::CacheError;
pub use extract::{extract_imports, ElementExtractor};
