//! Concept: a stored unit of knowledge.
//!
//! A concept is a short piece of text with usage statistics and an optional
//! embedding. Its identifier is derived from its content, so learning the same
//! text twice always resolves to the same concept.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for name-based concept identifiers.
///
/// Changing this value changes every concept id and invalidates existing
/// storage files.
pub const CONCEPT_NAMESPACE: Uuid = Uuid::from_u128(0x5c0e_9b1a_47d2_4f6e_8a3b_c1d0_e2f3_a4b5);

/// Stable 16-byte concept identifier.
///
/// Derived deterministically from content with a name-based (v5) UUID.
///
/// # Example
///
/// ```rust
/// use concept_graph_core::types::ConceptId;
///
/// let a = ConceptId::from_content("rust is a systems language");
/// let b = ConceptId::from_content("rust is a systems language");
/// assert_eq!(a, b);
/// assert_ne!(a, ConceptId::from_content("rust is a systems language!"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(Uuid);

impl ConceptId {
    /// Derive the identifier for a piece of content.
    ///
    /// The exact UTF-8 bytes are hashed; no trimming or case folding happens
    /// here, callers decide what "identical content" means before calling.
    pub fn from_content(content: &str) -> Self {
        Self(Uuid::new_v5(&CONCEPT_NAMESPACE, content.as_bytes()))
    }

    /// Wrap raw identifier bytes (used by the storage codec).
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ConceptId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A concept stored in the graph.
///
/// # Fields
/// - `id`: content-derived identifier, immutable
/// - `content`: UTF-8 text, bounded by [`MAX_CONTENT_BYTES`](super::MAX_CONTENT_BYTES)
/// - `strength`: usage-weighted importance, only increases
/// - `confidence`: asserted confidence in `[0, 1]`
/// - `access_count`: monotonic read counter
/// - `created`: creation time, millisecond precision
/// - `embedding`: optional fixed-dimension vector (durable copy)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub content: String,
    pub strength: f32,
    pub confidence: f32,
    pub access_count: u64,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Concept {
    /// Create a concept with a content-derived id and the current time.
    ///
    /// No validation happens here; the store validates before persisting.
    pub fn new(content: impl Into<String>, strength: f32, confidence: f32) -> Self {
        let content = content.into();
        Self {
            id: ConceptId::from_content(&content),
            content,
            strength,
            confidence,
            access_count: 0,
            created: now_millis(),
            embedding: None,
        }
    }

    /// Builder: attach an embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Creation time as Unix epoch milliseconds (the on-disk representation).
    pub fn created_millis(&self) -> i64 {
        self.created.timestamp_millis()
    }
}

/// Current time truncated to millisecond precision so it survives the
/// storage round-trip unchanged.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_deterministic() {
        let a = ConceptId::from_content("the sky is blue");
        let b = ConceptId::from_content("the sky is blue");
        assert_eq!(a, b);
    }

    #[test]
    fn test_id_differs_for_different_content() {
        let a = ConceptId::from_content("the sky is blue");
        let b = ConceptId::from_content("the sky is Blue");
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_bytes_roundtrip() {
        let id = ConceptId::from_content("bytes");
        assert_eq!(ConceptId::from_bytes(*id.as_bytes()), id);
    }

    #[test]
    fn test_new_concept_defaults() {
        let concept = Concept::new("gravity pulls objects", 2.0, 0.75);
        assert_eq!(concept.id, ConceptId::from_content("gravity pulls objects"));
        assert_eq!(concept.access_count, 0);
        assert!(concept.embedding.is_none());
        assert_eq!(concept.created.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_created_millis_roundtrip() {
        let concept = Concept::new("time", 1.0, 1.0);
        let restored = DateTime::from_timestamp_millis(concept.created_millis()).unwrap();
        assert_eq!(restored, concept.created);
    }
}
