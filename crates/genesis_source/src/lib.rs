//! Source text management and location tracking for diagnostics.
//!
//! [`SourceDb`] owns the text of every file in a session. Tokens and tree
//! nodes refer back to it through a [`FileId`] plus a byte-offset [`Span`];
//! [`Position`] is the 1-indexed line/column form shown to users.

#![warn(missing_docs)]

pub mod file_id;
pub mod position;
pub mod source_db;
pub mod source_file;
pub mod span;

pub use file_id::FileId;
pub use position::Position;
pub use source_db::SourceDb;
pub use source_file::SourceFile;
pub use span::Span;
