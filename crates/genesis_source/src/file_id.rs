//! Opaque identifier for a file loaded into a [`SourceDb`](crate::SourceDb).

use serde::{Deserialize, Serialize};

/// Opaque identifier for a loaded source file.
///
/// Ids are handed out sequentially by the [`SourceDb`](crate::SourceDb).
/// Text that never went through the database (e.g. a string handed straight
/// to the tokenizer) uses [`FileId::ANONYMOUS`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    /// The id used for in-memory text not registered in any database.
    pub const ANONYMOUS: FileId = FileId(u32::MAX);

    /// Creates a `FileId` from a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns `true` for [`FileId::ANONYMOUS`].
    pub fn is_anonymous(self) -> bool {
        self == Self::ANONYMOUS
    }
}
