//! Byte-offset ranges within source files.

use crate::file_id::FileId;
use serde::{Deserialize, Serialize};

/// A byte offset range within a source file.
///
/// `start` is inclusive and `end` is exclusive. Synthetic nodes fabricated
/// during error recovery use [`Span::DUMMY`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
    /// The file this span belongs to.
    pub file: FileId,
    /// Byte offset of the first byte.
    pub start: u32,
    /// Byte offset one past the last byte.
    pub end: u32,
}

impl Span {
    /// A span with no source location.
    pub const DUMMY: Span = Span {
        file: FileId::ANONYMOUS,
        start: u32::MAX,
        end: u32::MAX,
    };

    /// Creates a new span.
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Returns a span covering both `self` and `other`.
    ///
    /// Merging with [`Span::DUMMY`] returns the other span unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the two spans are from different files.
    pub fn merge(self, other: Span) -> Span {
        if self.is_dummy() {
            return other;
        }
        if other.is_dummy() {
            return self;
        }
        assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Returns `true` if this span has zero length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if this is [`Span::DUMMY`].
    pub fn is_dummy(&self) -> bool {
        self.start == u32::MAX && self.end == u32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        let f = FileId::from_raw(0);
        let m = Span::new(f, 5, 15).merge(Span::new(f, 10, 25));
        assert_eq!((m.start, m.end), (5, 25));
    }

    #[test]
    fn merge_with_dummy_keeps_real_span() {
        let f = FileId::from_raw(0);
        let real = Span::new(f, 3, 9);
        assert_eq!(Span::DUMMY.merge(real), real);
        assert_eq!(real.merge(Span::DUMMY), real);
    }

    #[test]
    fn len_and_empty() {
        let f = FileId::ANONYMOUS;
        assert_eq!(Span::new(f, 10, 20).len(), 10);
        assert!(Span::new(f, 5, 5).is_empty());
    }

    #[test]
    fn anonymous_file_span_is_not_dummy() {
        assert!(Span::DUMMY.is_dummy());
        assert!(!Span::new(FileId::ANONYMOUS, 0, 0).is_dummy());
    }

    #[test]
    fn serde_roundtrip() {
        let s = Span::new(FileId::from_raw(1), 10, 20);
        let json = serde_json::to_string(&s).unwrap();
        let back: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
