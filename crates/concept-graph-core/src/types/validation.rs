//! Validation of concept and association inputs.
//!
//! Every mutating store operation runs these checks before a single byte is
//! written to the write-ahead log.

use thiserror::Error;

use super::concept::ConceptId;

/// Maximum concept content size in bytes (64 KiB).
pub const MAX_CONTENT_BYTES: usize = 64 * 1024;

/// Maximum strength accepted at creation.
pub const MAX_STRENGTH: f32 = 1_000_000.0;

/// Errors that occur during input validation.
///
/// # Example
/// ```rust
/// use concept_graph_core::types::{validate_confidence, ValidationError};
///
/// let error = validate_confidence("confidence", 1.5).unwrap_err();
/// assert!(matches!(error, ValidationError::OutOfBounds { .. }));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Content is empty or only whitespace.
    #[error("Content must not be empty")]
    EmptyContent,

    /// Content exceeds [`MAX_CONTENT_BYTES`].
    #[error("Content size {size} bytes exceeds maximum allowed {max_size} bytes")]
    ContentTooLarge { size: usize, max_size: usize },

    /// A numeric field value is outside its valid range.
    #[error("Field '{field}' value {value} is out of bounds [{min}, {max}]")]
    OutOfBounds {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A numeric field is NaN or infinite.
    #[error("Field '{field}' must be finite")]
    NonFinite { field: String },

    /// Embedding has the wrong number of dimensions.
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    EmbeddingDimension { expected: usize, actual: usize },

    /// Embedding is all zeros and has no direction for cosine similarity.
    #[error("Embedding must not be the zero vector")]
    ZeroEmbedding,

    /// An association endpoint does not reference a stored concept.
    #[error("Association {role} concept {id} does not exist")]
    MissingEndpoint { role: String, id: ConceptId },

    /// A caller-supplied id does not match the content-derived id.
    #[error("Supplied concept id {supplied} does not match content-derived id {derived}")]
    IdMismatch {
        supplied: ConceptId,
        derived: ConceptId,
    },

    /// Unknown association type tag.
    #[error("Unknown association type tag {0}")]
    UnknownAssociationType(u8),

    /// A request parameter is out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Validate concept content.
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if content.len() > MAX_CONTENT_BYTES {
        return Err(ValidationError::ContentTooLarge {
            size: content.len(),
            max_size: MAX_CONTENT_BYTES,
        });
    }
    Ok(())
}

/// Validate a confidence value in `[0, 1]`.
pub fn validate_confidence(field: &str, value: f32) -> Result<(), ValidationError> {
    check_range(field, value, 0.0, 1.0)
}

/// Validate a strength value in `[0, MAX_STRENGTH]`.
pub fn validate_strength(value: f32) -> Result<(), ValidationError> {
    check_range("strength", value, 0.0, MAX_STRENGTH)
}

/// Validate an embedding against the configured dimension.
pub fn validate_embedding(embedding: &[f32], dimension: usize) -> Result<(), ValidationError> {
    if embedding.len() != dimension {
        return Err(ValidationError::EmbeddingDimension {
            expected: dimension,
            actual: embedding.len(),
        });
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::NonFinite {
            field: "embedding".to_string(),
        });
    }
    if embedding.iter().all(|v| *v == 0.0) {
        return Err(ValidationError::ZeroEmbedding);
    }
    Ok(())
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            field: field.to_string(),
        });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfBounds {
            field: field.to_string(),
            value: f64::from(value),
            min: f64::from(min),
            max: f64::from(max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_rejected() {
        assert_eq!(validate_content(""), Err(ValidationError::EmptyContent));
        assert_eq!(validate_content("   \n\t"), Err(ValidationError::EmptyContent));
    }

    #[test]
    fn test_oversized_content_rejected() {
        let content = "x".repeat(MAX_CONTENT_BYTES + 1);
        let err = validate_content(&content).unwrap_err();
        assert!(matches!(err, ValidationError::ContentTooLarge { size, .. } if size == MAX_CONTENT_BYTES + 1));
    }

    #[test]
    fn test_content_at_limit_accepted() {
        let content = "x".repeat(MAX_CONTENT_BYTES);
        assert!(validate_content(&content).is_ok());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(validate_confidence("confidence", 0.0).is_ok());
        assert!(validate_confidence("confidence", 1.0).is_ok());
        assert!(validate_confidence("confidence", -0.01).is_err());
        assert!(validate_confidence("confidence", 1.01).is_err());
    }

    #[test]
    fn test_nan_is_non_finite() {
        let err = validate_confidence("confidence", f32::NAN).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonFinite {
                field: "confidence".to_string()
            }
        );
        assert!(validate_strength(f32::INFINITY).is_err());
    }

    #[test]
    fn test_strength_bounds() {
        assert!(validate_strength(0.0).is_ok());
        assert!(validate_strength(MAX_STRENGTH).is_ok());
        assert!(validate_strength(-1.0).is_err());
    }

    #[test]
    fn test_embedding_validation() {
        assert!(validate_embedding(&[0.1, 0.2, 0.3], 3).is_ok());
        assert_eq!(
            validate_embedding(&[0.1, 0.2], 3),
            Err(ValidationError::EmbeddingDimension {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            validate_embedding(&[0.0, 0.0, 0.0], 3),
            Err(ValidationError::ZeroEmbedding)
        );
        assert!(validate_embedding(&[0.1, f32::NAN, 0.3], 3).is_err());
    }
}
