//! A loaded source file with a line-start index.

use crate::file_id::FileId;
use crate::position::Position;
use genesis_common::ContentHash;
use std::path::PathBuf;

/// A source file loaded into the session.
///
/// Line starts are computed once so that offset-to-position lookups and
/// line extraction for diagnostics are a binary search away.
pub struct SourceFile {
    /// The id of this file within its [`SourceDb`](crate::SourceDb).
    pub id: FileId,
    /// Filesystem path, or a synthetic name for in-memory sources.
    pub path: PathBuf,
    /// Full text content.
    pub content: String,
    /// Byte offset of each line start; the first entry is always 0.
    line_starts: Vec<u32>,
    /// SHA-256 of the content.
    pub content_hash: ContentHash,
}

impl SourceFile {
    /// Creates a `SourceFile`, indexing line starts and hashing the content.
    pub fn new(id: FileId, path: PathBuf, content: String) -> Self {
        let line_starts = line_starts(&content);
        let content_hash = ContentHash::from_str_content(&content);
        Self {
            id,
            path,
            content,
            line_starts,
            content_hash,
        }
    }

    /// Converts a byte offset into a 1-indexed [`Position`].
    pub fn position(&self, byte_offset: u32) -> Position {
        let offset = byte_offset.min(self.content.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line_idx] as usize;
        let column = self.content[line_start..offset as usize].chars().count() as u32 + 1;
        Position::new(line_idx as u32 + 1, column)
    }

    /// Returns the text of a 1-indexed line without its terminator.
    ///
    /// Out-of-range lines yield an empty string.
    pub fn line_text(&self, line: u32) -> &str {
        line_text(&self.content, line)
    }

    /// Number of lines (an empty file has one empty line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the content between two byte offsets.
    pub fn snippet(&self, start: u32, end: u32) -> &str {
        &self.content[start as usize..end as usize]
    }
}

/// Returns the text of a 1-indexed line of `content`, without `\r\n` / `\n`.
pub fn line_text(content: &str, line: u32) -> &str {
    if line == 0 {
        return "";
    }
    content
        .split('\n')
        .nth(line as usize - 1)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or("")
}

fn line_starts(content: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(content: &str) -> SourceFile {
        SourceFile::new(
            FileId::from_raw(0),
            PathBuf::from("main.gen"),
            content.to_string(),
        )
    }

    #[test]
    fn line_starts_computation() {
        let f = make_file("abc\ndef\nghi");
        assert_eq!(f.line_starts, vec![0, 4, 8]);
        assert_eq!(f.line_count(), 3);
    }

    #[test]
    fn position_resolution() {
        let f = make_file("abc\ndef\nghi");
        assert_eq!(f.position(0), Position::new(1, 1));
        assert_eq!(f.position(4), Position::new(2, 1));
        assert_eq!(f.position(5), Position::new(2, 2));
        assert_eq!(f.position(8), Position::new(3, 1));
    }

    #[test]
    fn position_counts_characters() {
        let f = make_file("é = x");
        // 'é' is two bytes; '=' starts at byte 3 but column 3
        assert_eq!(f.position(3), Position::new(1, 3));
    }

    #[test]
    fn line_text_strips_terminators() {
        let f = make_file("first\r\nsecond\nthird");
        assert_eq!(f.line_text(1), "first");
        assert_eq!(f.line_text(2), "second");
        assert_eq!(f.line_text(3), "third");
        assert_eq!(f.line_text(4), "");
        assert_eq!(f.line_text(0), "");
    }

    #[test]
    fn empty_file() {
        let f = make_file("");
        assert_eq!(f.position(0), Position::START);
        assert_eq!(f.line_count(), 1);
    }

    #[test]
    fn content_hash_computed() {
        let f = make_file("function a {}");
        assert_eq!(f.content_hash, ContentHash::from_bytes(b"function a {}"));
    }
}
