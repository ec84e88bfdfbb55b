//! In-memory graph guarded by the store's lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::DateTime;
use concept_graph_core::config::IndexConfig;
use concept_graph_core::normalize_tokens;
use concept_graph_core::types::{Association, AssociationType, Concept, ConceptId};

use crate::error::{StorageError, StorageResult};
use crate::index::VectorIndex;
use crate::serialization::GraphSnapshot;
use crate::wal::WalOp;

/// Strength added by each recorded access.
pub const ACCESS_STRENGTH_BOOST: f32 = 0.1;

type EdgeKey = (ConceptId, ConceptId, AssociationType);

/// A stored concept whose access statistics can change under a shared lock.
struct ConceptSlot {
    concept: Concept,
    access_count: AtomicU64,
    strength_bits: AtomicU32,
}

impl ConceptSlot {
    fn new(concept: Concept) -> Self {
        Self {
            access_count: AtomicU64::new(concept.access_count),
            strength_bits: AtomicU32::new(concept.strength.to_bits()),
            concept,
        }
    }

    fn strength(&self) -> f32 {
        f32::from_bits(self.strength_bits.load(Ordering::Acquire))
    }

    fn raise_strength(&self, strength: f32) {
        let _ = self
            .strength_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (strength > f32::from_bits(bits)).then(|| strength.to_bits())
            });
    }

    fn record_access(&self) {
        self.access_count.fetch_add(1, Ordering::AcqRel);
        let _ = self
            .strength_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f32::from_bits(bits) + ACCESS_STRENGTH_BOOST).to_bits())
            });
    }

    fn materialize(&self) -> Concept {
        Concept {
            strength: self.strength(),
            access_count: self.access_count.load(Ordering::Acquire),
            ..self.concept.clone()
        }
    }
}

/// Outcome of applying a concept write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConceptApplied {
    Created,
    Merged,
}

/// The in-memory graph: concepts in store order, typed edges with adjacency
/// lists, the token index and the vector index.
///
/// Read access is handed out through [`GraphStore::read`](super::GraphStore::read);
/// every method here is a pure read.
pub struct GraphState {
    slots: Vec<ConceptSlot>,
    positions: HashMap<ConceptId, usize>,
    edges: Vec<Association>,
    edge_slots: HashMap<EdgeKey, usize>,
    outgoing: HashMap<ConceptId, Vec<usize>>,
    incoming: HashMap<ConceptId, Vec<usize>>,
    tokens: HashMap<String, Vec<ConceptId>>,
    index: VectorIndex,
    pub(crate) last_sequence: u64,
    pub(crate) last_write_millis: i64,
}

impl GraphState {
    pub(crate) fn new(index_config: IndexConfig) -> Self {
        Self {
            slots: Vec::new(),
            positions: HashMap::new(),
            edges: Vec::new(),
            edge_slots: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            tokens: HashMap::new(),
            index: VectorIndex::new(index_config),
            last_sequence: 0,
            last_write_millis: 0,
        }
    }

    /// Rebuild from a decoded file: concepts and edges in file order,
    /// embeddings in the order the vector index originally received them.
    pub(crate) fn from_snapshot(
        snapshot: GraphSnapshot,
        index_config: IndexConfig,
    ) -> StorageResult<Self> {
        let mut state = Self::new(index_config);
        state.last_sequence = snapshot.header.last_sequence;
        state.last_write_millis = snapshot.header.last_write_millis;

        for concept in snapshot.concepts {
            if state.positions.contains_key(&concept.id) {
                return Err(StorageError::Corrupted(format!(
                    "concept {} appears twice",
                    concept.id
                )));
            }
            state.insert_slot(concept);
        }
        for id in &snapshot.index_order {
            let embedding = state
                .positions
                .get(id)
                .and_then(|&pos| state.slots[pos].concept.embedding.as_deref())
                .ok_or_else(|| {
                    StorageError::Corrupted(format!("indexed concept {} has no embedding", id))
                })?;
            state.index.insert(*id, embedding)?;
        }
        for edge in snapshot.edges {
            for (role, id) in [("source", edge.source_id), ("target", edge.target_id)] {
                if !state.positions.contains_key(&id) {
                    return Err(StorageError::Corrupted(format!(
                        "edge {} concept {} is not in the concept section",
                        role, id
                    )));
                }
            }
            state.merge_edge(edge);
        }
        Ok(state)
    }

    /// Apply a logged mutation. Idempotent: replaying an entry twice leaves
    /// the same graph.
    pub(crate) fn apply(&mut self, sequence: u64, op: &WalOp) -> StorageResult<()> {
        match op {
            WalOp::LearnConcept {
                content,
                embedding,
                strength,
                confidence,
                created_millis,
            } => {
                self.apply_concept(
                    content,
                    embedding.as_deref(),
                    *strength,
                    *confidence,
                    *created_millis,
                )?;
            }
            WalOp::LearnAssociation {
                source_id,
                target_id,
                assoc_type,
                confidence,
            } => {
                for (role, id) in [("source", source_id), ("target", target_id)] {
                    if !self.contains(id) {
                        return Err(StorageError::Corrupted(format!(
                            "log entry {} references missing {} concept {}",
                            sequence, role, id
                        )));
                    }
                }
                self.merge_edge(Association::new(
                    *source_id,
                    *target_id,
                    *assoc_type,
                    *confidence,
                ));
            }
        }
        self.last_sequence = self.last_sequence.max(sequence);
        Ok(())
    }

    pub(crate) fn apply_concept(
        &mut self,
        content: &str,
        embedding: Option<&[f32]>,
        strength: f32,
        confidence: f32,
        created_millis: i64,
    ) -> StorageResult<ConceptApplied> {
        let id = ConceptId::from_content(content);
        if let Some(&pos) = self.positions.get(&id) {
            self.slots[pos].raise_strength(strength);
            if let Some(embedding) = embedding {
                if self.slots[pos].concept.embedding.is_none() {
                    self.index.insert(id, embedding)?;
                    self.slots[pos].concept.embedding = Some(embedding.to_vec());
                }
            }
            return Ok(ConceptApplied::Merged);
        }

        let created = DateTime::from_timestamp_millis(created_millis).ok_or_else(|| {
            StorageError::Corrupted(format!("timestamp {} out of range", created_millis))
        })?;
        if let Some(embedding) = embedding {
            self.index.insert(id, embedding)?;
        }
        self.insert_slot(Concept {
            id,
            content: content.to_string(),
            strength,
            confidence,
            access_count: 0,
            created,
            embedding: embedding.map(<[f32]>::to_vec),
        });
        Ok(ConceptApplied::Created)
    }

    fn insert_slot(&mut self, concept: Concept) {
        let id = concept.id;
        for token in normalize_tokens(&concept.content) {
            self.tokens.entry(token).or_default().push(id);
        }
        self.positions.insert(id, self.slots.len());
        self.slots.push(ConceptSlot::new(concept));
    }

    /// Insert an edge, or keep the higher confidence if the typed pair exists.
    pub(crate) fn merge_edge(&mut self, edge: Association) {
        if let Some(&slot) = self.edge_slots.get(&edge.key()) {
            let existing = &mut self.edges[slot];
            if edge.confidence > existing.confidence {
                existing.confidence = edge.confidence;
            }
            return;
        }
        let slot = self.edges.len();
        self.edge_slots.insert(edge.key(), slot);
        self.outgoing.entry(edge.source_id).or_default().push(slot);
        self.incoming.entry(edge.target_id).or_default().push(slot);
        self.edges.push(edge);
    }

    pub(crate) fn record_access(&self, id: &ConceptId) -> bool {
        match self.positions.get(id) {
            Some(&pos) => {
                self.slots[pos].record_access();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn concept_count(&self) -> usize {
        self.slots.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn get_concept(&self, id: &ConceptId) -> Option<Concept> {
        self.positions
            .get(id)
            .map(|&pos| self.slots[pos].materialize())
    }

    /// Confidence of a concept without cloning its content.
    pub fn concept_confidence(&self, id: &ConceptId) -> Option<f32> {
        self.positions
            .get(id)
            .map(|&pos| self.slots[pos].concept.confidence)
    }

    /// Concept ids in store order.
    pub fn concept_ids(&self) -> Vec<ConceptId> {
        self.slots.iter().map(|slot| slot.concept.id).collect()
    }

    /// Every concept, materialized, in store order.
    pub fn concepts(&self) -> Vec<Concept> {
        self.slots.iter().map(ConceptSlot::materialize).collect()
    }

    /// Every edge in insertion order.
    pub fn edges(&self) -> &[Association] {
        &self.edges
    }

    /// Outgoing edges of `id` in insertion order.
    pub fn outgoing(&self, id: &ConceptId) -> impl Iterator<Item = &Association> + '_ {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&slot| &self.edges[slot])
    }

    /// Incoming edges of `id` in insertion order.
    pub fn incoming(&self, id: &ConceptId) -> impl Iterator<Item = &Association> + '_ {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .map(|&slot| &self.edges[slot])
    }

    /// Distinct outgoing targets in first-insertion order.
    pub fn neighbors(&self, id: &ConceptId) -> Vec<ConceptId> {
        dedup_in_order(self.outgoing(id).map(|edge| edge.target_id))
    }

    /// Distinct incoming sources in first-insertion order.
    pub fn incoming_neighbors(&self, id: &ConceptId) -> Vec<ConceptId> {
        dedup_in_order(self.incoming(id).map(|edge| edge.source_id))
    }

    /// Concepts whose content contains a normalized token, in store order.
    pub fn concepts_with_token(&self, token: &str) -> &[ConceptId] {
        self.tokens.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

fn dedup_in_order(ids: impl Iterator<Item = ConceptId>) -> Vec<ConceptId> {
    let mut out: Vec<ConceptId> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
