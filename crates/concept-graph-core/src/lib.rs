//! Concept Graph Core Library
//!
//! Core domain types shared by every layer of the Concept Graph engine.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`ConceptId`, `Concept`, `Association`, `AssociationType`)
//! - Input validation with [`ValidationError`]
//! - The token normalizer used by the query cache, the token index and
//!   association extraction
//! - Configuration structures
//! - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use concept_graph_core::types::{Concept, ConceptId};
//!
//! let concept = Concept::new("water boils at 100C", 1.0, 0.9);
//! assert_eq!(concept.id, ConceptId::from_content("water boils at 100C"));
//! ```

pub mod config;
pub mod error;
pub mod tokenizer;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use tokenizer::{normalize_tokens, token_overlap, tokenize, TokenSet};
pub use types::{
    Association, AssociationType, Concept, ConceptId, ValidationError, MAX_CONTENT_BYTES,
    MAX_STRENGTH,
};
