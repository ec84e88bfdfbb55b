//! Storage error types.
//!
//! These errors cover opening the data directory, write-ahead logging,
//! reconciliation and loading the compacted graph file. Messages carry enough
//! context to locate the failing file operation.

use concept_graph_core::types::ValidationError;
use thiserror::Error;

use crate::serialization::SerializationError;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A filesystem operation failed.
    ///
    /// In-memory state is unchanged when this is returned from a write.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What the store was doing, e.g. "appending to write-ahead log".
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The compacted file or a log frame could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Input rejected before anything was written.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// On-disk state is internally inconsistent.
    ///
    /// Raised at load time, e.g. an edge referencing a concept that is not
    /// in the file.
    #[error("Storage corrupted: {0}")]
    Corrupted(String),

    /// A reconciliation task ended without reporting a result.
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),
}

impl StorageError {
    /// Wrap an I/O error with a short description of the operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors caused by caller input rather than the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, StorageError::Validation(_))
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_context() {
        let error = StorageError::io(
            "renaming graph.cgdb.tmp",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = error.to_string();
        assert!(msg.contains("renaming graph.cgdb.tmp"));
        assert!(msg.contains("denied"));
        assert!(!error.is_validation());
    }

    #[test]
    fn test_from_validation_error() {
        let error: StorageError = ValidationError::EmptyContent.into();
        assert!(error.is_validation());
        assert!(error.to_string().contains("Validation error"));
    }

    #[test]
    fn test_from_serialization_error() {
        let error: StorageError = SerializationError::UnsupportedVersion(9).into();
        assert!(matches!(error, StorageError::Serialization(_)));
        assert!(error.to_string().contains("9"));
    }
}
