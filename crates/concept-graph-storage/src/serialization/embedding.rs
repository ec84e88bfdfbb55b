//! Embedding serialization using raw little-endian bytes.
//!
//! Each f32 becomes exactly 4 bytes; no length prefix is written because the
//! concept record header carries the dimension.

use super::error::SerializationError;

/// Append an embedding as raw f32 little-endian bytes.
///
/// # Example
/// ```rust
/// use concept_graph_storage::serialization::serialize_embedding;
///
/// let mut bytes = Vec::new();
/// serialize_embedding(&[0.5_f32; 8], &mut bytes);
/// assert_eq!(bytes.len(), 8 * 4);
/// ```
pub fn serialize_embedding(embedding: &[f32], out: &mut Vec<u8>) {
    out.reserve(embedding.len() * 4);
    for &value in embedding {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Decode raw f32 little-endian bytes.
///
/// # Errors
/// * `SerializationError::InvalidEmbeddingSize` - if `bytes.len() % 4 != 0`
pub fn deserialize_embedding(bytes: &[u8]) -> Result<Vec<f32>, SerializationError> {
    if bytes.len() % 4 != 0 {
        return Err(SerializationError::InvalidEmbeddingSize {
            expected: ((bytes.len() / 4) + 1) * 4,
            actual: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
