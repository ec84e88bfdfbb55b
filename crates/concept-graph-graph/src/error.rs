//! Error types for graph reasoning operations.

use concept_graph_core::types::ValidationError;
use concept_graph_core::CoreError;
use concept_graph_storage::StorageError;
use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Error type for reasoning, extraction and engine operations.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Underlying store failed or rejected a write.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input failed domain validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Engine configuration was rejected at open.
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    /// A query parameter is out of its allowed range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl GraphError {
    /// True when the caller sent bad input, including validation failures
    /// reported by the store.
    pub fn is_validation(&self) -> bool {
        match self {
            GraphError::Validation(_) | GraphError::InvalidParameter { .. } => true,
            GraphError::Storage(e) => e.is_validation(),
            GraphError::Config(_) => false,
        }
    }
}
