//! Error types for concept-graph-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the crate, along with the [`CoreResult<T>`] type alias.
//!
//! # Examples
//!
//! ```rust
//! use concept_graph_core::CoreError;
//!
//! let error = CoreError::ConfigError("index.dimension must be > 0".into());
//! assert!(error.to_string().contains("index.dimension"));
//! ```

use thiserror::Error;

use crate::types::ValidationError;

/// Top-level error type for concept-graph-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration could not be read, parsed or failed validation.
    ///
    /// # When This Occurs
    ///
    /// - Config file missing or not valid TOML
    /// - A value outside its allowed range (zero dimension, zero port)
    /// - Environment override with the wrong type
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input failed domain validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = CoreError::ConfigError("server.port must be > 0".to_string());
        assert!(error.to_string().contains("Configuration error"));
        assert!(error.to_string().contains("server.port"));
    }

    #[test]
    fn test_from_validation_error() {
        let error: CoreError = ValidationError::EmptyContent.into();
        assert!(matches!(error, CoreError::Validation(ValidationError::EmptyContent)));
    }
}
