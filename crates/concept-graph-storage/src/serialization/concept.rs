//! Concept records: a fixed 52-byte header followed by content and
//! embedding bytes.
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 16 | id |
//! | 16 | 4 | content length |
//! | 20 | 4 | strength (f32) |
//! | 24 | 4 | confidence (f32) |
//! | 28 | 8 | access count |
//! | 36 | 8 | created, epoch millis |
//! | 44 | 4 | embedding dimension (0 = none) |
//! | 48 | 4 | vector index rank, 1-based (0 = not indexed) |

use chrono::DateTime;
use concept_graph_core::types::{Concept, ConceptId};

use super::embedding::{deserialize_embedding, serialize_embedding};
use super::error::SerializationError;
use super::reader::ByteReader;

/// Fixed part of a concept record.
pub const CONCEPT_HEADER_LEN: usize = 52;

/// Append one concept record.
///
/// `index_rank` is the concept's 1-based position in vector index insertion
/// order, or 0 when it has no embedding.
pub fn encode_concept(concept: &Concept, index_rank: u32, out: &mut Vec<u8>) {
    let dim = concept.embedding.as_ref().map_or(0, Vec::len);
    out.reserve(CONCEPT_HEADER_LEN + concept.content.len() + dim * 4);
    out.extend_from_slice(concept.id.as_bytes());
    out.extend_from_slice(&(concept.content.len() as u32).to_le_bytes());
    out.extend_from_slice(&concept.strength.to_le_bytes());
    out.extend_from_slice(&concept.confidence.to_le_bytes());
    out.extend_from_slice(&concept.access_count.to_le_bytes());
    out.extend_from_slice(&concept.created_millis().to_le_bytes());
    out.extend_from_slice(&(dim as u32).to_le_bytes());
    out.extend_from_slice(&index_rank.to_le_bytes());
    out.extend_from_slice(concept.content.as_bytes());
    if let Some(embedding) = &concept.embedding {
        serialize_embedding(embedding, out);
    }
}

/// Decode one concept record and its vector index rank.
pub(crate) fn decode_concept(
    reader: &mut ByteReader<'_>,
) -> Result<(Concept, u32), SerializationError> {
    const SECTION: &str = "concept record";

    let id = ConceptId::from_bytes(reader.array::<16>(SECTION)?);
    let content_len = reader.u32(SECTION)? as usize;
    let strength = reader.f32(SECTION)?;
    let confidence = reader.f32(SECTION)?;
    let access_count = reader.u64(SECTION)?;
    let created_millis = reader.i64(SECTION)?;
    let dim = reader.u32(SECTION)? as usize;
    let index_rank = reader.u32(SECTION)?;
    if dim == 0 && index_rank != 0 {
        return Err(SerializationError::DeserializeFailed(format!(
            "concept {} has index rank {} but no embedding",
            id, index_rank
        )));
    }

    let content = std::str::from_utf8(reader.take(content_len, "concept content")?)
        .map_err(|e| SerializationError::InvalidUtf8(e.to_string()))?
        .to_string();
    let embedding = if dim == 0 {
        None
    } else {
        Some(deserialize_embedding(
            reader.take(dim * 4, "concept embedding")?,
        )?)
    };
    let created = DateTime::from_timestamp_millis(created_millis).ok_or_else(|| {
        SerializationError::DeserializeFailed(format!(
            "created timestamp {} out of range",
            created_millis
        ))
    })?;

    let concept = Concept {
        id,
        content,
        strength,
        confidence,
        access_count,
        created,
        embedding,
    };
    Ok((concept, index_rank))
}
