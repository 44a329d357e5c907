//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Loading is fail-safe: [`CompilationCache::load`](crate::CompilationCache::load)
/// turns every one of these into an empty cache. They surface to the caller
/// only from writes and from the strict [`CompilationCache::read`](crate::CompilationCache::read).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a cache or source file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache file is not a valid serialized cache.
    #[error("failed to parse cache file {path}: {reason}")]
    Parse {
        /// The cache file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The cache file was written by a different cache format version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The cache file path.
        path: PathBuf,
        /// The format version this build understands.
        expected: String,
        /// The format version found in the file.
        actual: String,
    },

    /// The in-memory cache could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from(".genesis/cache.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("cache.json"));
    }

    #[test]
    fn version_mismatch_display() {
        let err = CacheError::VersionMismatch {
            path: PathBuf::from("cache.json"),
            expected: "1.0.0".to_string(),
            actual: "0.9.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 1.0.0"));
        assert!(msg.contains("got 0.9.0"));
    }

    #[test]
    fn parse_error_display() {
        let err = CacheError::Parse {
            path: PathBuf::from("cache.json"),
            reason: "EOF while parsing".to_string(),
        };
        assert!(err.to_string().contains("EOF while parsing"));
    }
}
