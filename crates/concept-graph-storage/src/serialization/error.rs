//! Serialization error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding the compacted graph file
/// and write-ahead log frames.
///
/// These errors indicate format problems or corruption. They are converted to
/// [`StorageError::Serialization`](crate::StorageError::Serialization) when
/// propagated from storage operations.
///
/// `bincode::Error` does not implement `Clone`, so bincode failures are kept
/// as message strings.
///
/// # Example
///
/// ```rust
/// use concept_graph_storage::serialization::{decode_snapshot, SerializationError};
///
/// let err = decode_snapshot(b"CG").unwrap_err();
/// assert!(matches!(err, SerializationError::Truncated { .. }));
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SerializationError {
    /// File does not start with the expected magic bytes.
    #[error("Bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    /// File format version is not one this build can read.
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// Input ended before a complete record could be read.
    #[error("Truncated {section}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Which part of the file was being read.
        section: &'static str,
        needed: usize,
        available: usize,
    },

    /// Edge record carries an association tag outside the known set.
    #[error("Unknown association type tag {0}")]
    UnknownAssociationType(u8),

    /// Concept content is not valid UTF-8.
    #[error("Invalid UTF-8 in concept content: {0}")]
    InvalidUtf8(String),

    /// Log frame checksum does not match its payload.
    #[error("Checksum mismatch: expected {expected:#018x}, computed {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    /// Bytes remain after the last section declared by the header.
    #[error("{0} trailing bytes after edge section")]
    TrailingBytes(usize),

    /// Embedding byte length is not a multiple of 4.
    #[error("Invalid embedding size: expected {expected} bytes, got {actual}")]
    InvalidEmbeddingSize { expected: usize, actual: usize },

    /// bincode encoding failed.
    #[error("Serialization failed: {0}")]
    SerializeFailed(String),

    /// bincode decoding failed.
    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),
}
