//! Central store of every source file in a session.

use crate::file_id::FileId;
use crate::position::Position;
use crate::source_file::SourceFile;
use crate::span::Span;
use std::io;
use std::path::{Path, PathBuf};

/// Owns all loaded source text and resolves [`Span`]s to [`Position`]s.
pub struct SourceDb {
    files: Vec<SourceFile>,
}

impl SourceDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Reads a file from disk and returns its [`FileId`].
    pub fn load_file(&mut self, path: &Path) -> Result<FileId, io::Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.add_source(path, content))
    }

    /// Adds in-memory text under the given display name.
    pub fn add_source(&mut self, name: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name.into(), content));
        id
    }

    /// Returns the file for `id`, or `None` for anonymous or unknown ids.
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.as_raw() as usize)
    }

    /// Returns the [`SourceFile`] for the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not produced by this database.
    pub fn get_file(&self, id: FileId) -> &SourceFile {
        &self.files[id.as_raw() as usize]
    }

    /// Resolves the start of a span to a position, if it has one.
    pub fn position(&self, span: Span) -> Option<Position> {
        if span.is_dummy() {
            return None;
        }
        self.file(span.file).map(|f| f.position(span.start))
    }

    /// Returns the source text covered by a span.
    pub fn snippet(&self, span: Span) -> &str {
        self.get_file(span.file).snippet(span.start, span.end)
    }

    /// Number of loaded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files are loaded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for SourceDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut db = SourceDb::new();
        let id = db.add_source("a.gen", "function a {}".to_string());
        assert_eq!(db.get_file(id).content, "function a {}");
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn resolve_position() {
        let mut db = SourceDb::new();
        let id = db.add_source("a.gen", "abc\ndef\nghi".to_string());
        assert_eq!(db.position(Span::new(id, 5, 7)), Some(Position::new(2, 2)));
        assert_eq!(db.position(Span::DUMMY), None);
    }

    #[test]
    fn anonymous_file_lookup_is_none() {
        let db = SourceDb::new();
        assert!(db.file(FileId::ANONYMOUS).is_none());
    }

    #[test]
    fn snippet() {
        let mut db = SourceDb::new();
        let id = db.add_source("a.gen", "hello world".to_string());
        assert_eq!(db.snippet(Span::new(id, 6, 11)), "world");
    }

    #[test]
    fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.gen");
        std::fs::write(&path, "@project \"demo\"").unwrap();

        let mut db = SourceDb::new();
        let id = db.load_file(&path).unwrap();
        assert_eq!(db.get_file(id).content, "@project \"demo\"");
        assert_eq!(db.get_file(id).path, path);
    }
}
