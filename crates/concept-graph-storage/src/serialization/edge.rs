//! Fixed 37-byte edge records: source id, target id, confidence, type tag.

use concept_graph_core::types::{Association, AssociationType, ConceptId};

use super::error::SerializationError;
use super::reader::ByteReader;

/// Size of one edge record.
pub const EDGE_RECORD_LEN: usize = 37;

/// Append one edge record.
pub fn encode_edge(edge: &Association, out: &mut Vec<u8>) {
    out.extend_from_slice(edge.source_id.as_bytes());
    out.extend_from_slice(edge.target_id.as_bytes());
    out.extend_from_slice(&edge.confidence.to_le_bytes());
    out.push(edge.assoc_type.tag());
}

pub(crate) fn decode_edge(reader: &mut ByteReader<'_>) -> Result<Association, SerializationError> {
    const SECTION: &str = "edge record";

    let source = ConceptId::from_bytes(reader.array::<16>(SECTION)?);
    let target = ConceptId::from_bytes(reader.array::<16>(SECTION)?);
    let confidence = reader.f32(SECTION)?;
    let tag = reader.u8(SECTION)?;
    let assoc_type = AssociationType::from_tag(tag)
        .map_err(|_| SerializationError::UnknownAssociationType(tag))?;

    Ok(Association::new(source, target, assoc_type, confidence))
}
