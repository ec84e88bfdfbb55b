//! Core domain types for the Concept Graph system.

mod association;
mod concept;
mod validation;

pub use association::{Association, AssociationType};
pub use concept::{Concept, ConceptId, CONCEPT_NAMESPACE};
pub use validation::{
    validate_confidence, validate_content, validate_embedding, validate_strength,
    ValidationError, MAX_CONTENT_BYTES, MAX_STRENGTH,
};
