//! Concept Graph reasoning layer.
//!
//! Builds on [`concept_graph_storage`] with:
//! - Bidirectional multi-path search with harmonic-mean confidence
//!   ([`traversal`], [`confidence`])
//! - Association extraction from free text ([`extraction`])
//! - A token-aware reasoning result cache ([`cache`])
//! - The [`KnowledgeEngine`] facade tying them to the store

pub mod cache;
pub mod confidence;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod traversal;

pub use cache::{CacheKey, CacheStats, QueryCache};
pub use engine::{EngineStats, KnowledgeEngine, LearnTextOutcome, ReasoningResult};
pub use error::{GraphError, GraphResult};
pub use extraction::{extract_associations, ExtractionPlan, PlannedAssociation};
pub use traversal::{find_path, find_paths, AssociationSource, Path, PathEdge, PathParams};
