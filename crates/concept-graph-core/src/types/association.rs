//! Association: a directed, typed, confidence-weighted edge between concepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::concept::ConceptId;
use super::validation::ValidationError;

/// Relationship type of an association.
///
/// The numeric tag is part of the on-disk edge record and must stay stable.
///
/// # Example
///
/// ```rust
/// use concept_graph_core::types::AssociationType;
///
/// let kind = AssociationType::Causal;
/// assert_eq!(AssociationType::from_tag(kind.tag()).unwrap(), kind);
/// assert_eq!(kind.to_string(), "causal");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationType {
    /// Shared meaning or topic.
    Semantic,
    /// Source causes or influences target.
    Causal,
    /// Source and target appeared in the same phrase.
    CoOccurrence,
    /// Source is a category or ancestor of target.
    Hierarchical,
    /// Source precedes target in time.
    Temporal,
}

impl AssociationType {
    /// Stable on-disk tag.
    #[inline]
    pub fn tag(&self) -> u8 {
        match self {
            Self::Semantic => 0,
            Self::Causal => 1,
            Self::CoOccurrence => 2,
            Self::Hierarchical => 3,
            Self::Temporal => 4,
        }
    }

    /// Decode an on-disk tag.
    pub fn from_tag(tag: u8) -> Result<Self, ValidationError> {
        match tag {
            0 => Ok(Self::Semantic),
            1 => Ok(Self::Causal),
            2 => Ok(Self::CoOccurrence),
            3 => Ok(Self::Hierarchical),
            4 => Ok(Self::Temporal),
            other => Err(ValidationError::UnknownAssociationType(other)),
        }
    }

    /// Returns all association type variants.
    #[inline]
    pub fn all() -> [AssociationType; 5] {
        [
            Self::Semantic,
            Self::Causal,
            Self::CoOccurrence,
            Self::Hierarchical,
            Self::Temporal,
        ]
    }
}

impl Default for AssociationType {
    fn default() -> Self {
        Self::Semantic
    }
}

impl fmt::Display for AssociationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Semantic => "semantic",
            Self::Causal => "causal",
            Self::CoOccurrence => "co_occurrence",
            Self::Hierarchical => "hierarchical",
            Self::Temporal => "temporal",
        };
        f.write_str(name)
    }
}

/// A directed edge between two concepts.
///
/// Duplicate `(source_id, target_id, assoc_type)` edges never coexist; the
/// store merges them by keeping the higher confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub source_id: ConceptId,
    pub target_id: ConceptId,
    pub assoc_type: AssociationType,
    pub confidence: f32,
}

impl Association {
    pub fn new(
        source_id: ConceptId,
        target_id: ConceptId,
        assoc_type: AssociationType,
        confidence: f32,
    ) -> Self {
        Self {
            source_id,
            target_id,
            assoc_type,
            confidence,
        }
    }

    /// Identity used for duplicate detection and merging.
    #[inline]
    pub fn key(&self) -> (ConceptId, ConceptId, AssociationType) {
        (self.source_id, self.target_id, self.assoc_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip_all_variants() {
        for kind in AssociationType::all() {
            assert_eq!(AssociationType::from_tag(kind.tag()).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = AssociationType::from_tag(42).unwrap_err();
        assert_eq!(err, ValidationError::UnknownAssociationType(42));
    }

    #[test]
    fn test_key_ignores_confidence() {
        let a = ConceptId::from_content("a");
        let b = ConceptId::from_content("b");
        let weak = Association::new(a, b, AssociationType::Causal, 0.1);
        let strong = Association::new(a, b, AssociationType::Causal, 0.9);
        assert_eq!(weak.key(), strong.key());
    }
}
