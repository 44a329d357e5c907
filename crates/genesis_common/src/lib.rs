//! Shared foundational types used across the Genesis compiler front end.
//!
//! Currently this is the SHA-256 [`ContentHash`] used by the change detector
//! and the source database to decide whether content changed between builds.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{ContentHash, ParseHashError};
