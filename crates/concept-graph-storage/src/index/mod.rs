//! Approximate nearest-neighbor index over concept embeddings.
//!
//! The index is a Hierarchical Navigable Small World graph using cosine
//! similarity. It lives inside the store's state and is populated on every
//! learn and on startup, so search results reflect every acknowledged write.

mod hnsw;
mod scored;

pub use hnsw::{SearchHit, VectorIndex, MAX_LEVEL};
