//! Whole-file encoding of the compacted graph.

use std::collections::HashMap;

use concept_graph_core::types::{Association, Concept, ConceptId};

use super::concept::{decode_concept, encode_concept, CONCEPT_HEADER_LEN};
use super::edge::{decode_edge, encode_edge, EDGE_RECORD_LEN};
use super::error::SerializationError;
use super::header::{FileHeader, HEADER_LEN};
use super::reader::ByteReader;

/// Decoded contents of a compacted graph file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    pub header: FileHeader,
    pub concepts: Vec<Concept>,
    pub edges: Vec<Association>,
    /// Ids of embedded concepts in vector index insertion order.
    pub index_order: Vec<ConceptId>,
}

/// Encode a complete graph file.
///
/// Concepts and edges are written in the order given. `index_order` lists
/// embedded concepts in the order the vector index received them; the loader
/// inserts embeddings in that order so the rebuilt index matches the live
/// one. Embedded concepts missing from `index_order` are indexed after the
/// listed ones, in file order.
pub fn encode_snapshot(
    concepts: &[Concept],
    edges: &[Association],
    index_order: &[ConceptId],
    last_write_millis: i64,
    last_sequence: u64,
) -> Vec<u8> {
    let content_bytes: usize = concepts
        .iter()
        .map(|c| {
            CONCEPT_HEADER_LEN + c.content.len() + c.embedding.as_ref().map_or(0, |e| e.len() * 4)
        })
        .sum();
    let mut out = Vec::with_capacity(HEADER_LEN + content_bytes + edges.len() * EDGE_RECORD_LEN);

    FileHeader {
        concept_count: concepts.len() as u64,
        edge_count: edges.len() as u64,
        last_write_millis,
        last_sequence,
    }
    .encode(&mut out);

    let ranks: HashMap<ConceptId, u32> = index_order
        .iter()
        .enumerate()
        .map(|(pos, id)| (*id, pos as u32 + 1))
        .collect();
    for concept in concepts {
        let rank = match concept.embedding {
            Some(_) => ranks.get(&concept.id).copied().unwrap_or(0),
            None => 0,
        };
        encode_concept(concept, rank, &mut out);
    }
    for edge in edges {
        encode_edge(edge, &mut out);
    }
    out
}

/// Decode a complete graph file.
///
/// # Errors
///
/// Refuses to guess on any irregularity: bad magic, unknown version, a
/// section shorter than the header declares, an unknown association tag, a
/// repeated index rank or trailing bytes all fail.
pub fn decode_snapshot(bytes: &[u8]) -> Result<GraphSnapshot, SerializationError> {
    let mut reader = ByteReader::new(bytes);
    let header = FileHeader::decode(&mut reader)?;

    // Counts come from disk; cap preallocation by what the input could hold.
    let concept_cap = (header.concept_count as usize).min(reader.remaining() / CONCEPT_HEADER_LEN);
    let mut concepts = Vec::with_capacity(concept_cap);
    let mut ranked: Vec<(u32, usize, ConceptId)> = Vec::new();
    for pos in 0..header.concept_count as usize {
        let (concept, rank) = decode_concept(&mut reader)?;
        if concept.embedding.is_some() {
            ranked.push((rank, pos, concept.id));
        }
        concepts.push(concept);
    }
    // Ranked entries first in rank order, then unranked ones in file order.
    ranked.sort_unstable_by_key(|&(rank, pos, _)| (rank == 0, rank, pos));
    for pair in ranked.windows(2) {
        if pair[0].0 != 0 && pair[0].0 == pair[1].0 {
            return Err(SerializationError::DeserializeFailed(format!(
                "index rank {} appears twice",
                pair[0].0
            )));
        }
    }
    let index_order = ranked.into_iter().map(|(_, _, id)| id).collect();

    let edge_cap = (header.edge_count as usize).min(reader.remaining() / EDGE_RECORD_LEN);
    let mut edges = Vec::with_capacity(edge_cap);
    for _ in 0..header.edge_count {
        edges.push(decode_edge(&mut reader)?);
    }

    if reader.remaining() > 0 {
        return Err(SerializationError::TrailingBytes(reader.remaining()));
    }

    Ok(GraphSnapshot {
        header,
        concepts,
        edges,
        index_order,
    })
}
