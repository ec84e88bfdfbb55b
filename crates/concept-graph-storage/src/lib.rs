//! Concept Graph Storage Layer
//!
//! Durable storage for the Concept Graph engine.
//!
//! # Architecture
//! - `serialization`: fixed-layout little-endian codec for the compacted file
//! - `wal`: checksummed write-ahead log of mutations
//! - `index`: HNSW vector index over concept embeddings
//! - `store`: [`GraphStore`], the in-memory graph with logging and
//!   reconciliation
//! - `reconciler`: tokio background task driving periodic reconciliation
//!
//! # Durability
//!
//! A mutation is acknowledged only after its log frame is written (and
//! fsynced, with `sync_every_write`). A crash at any point loses no
//! acknowledged write: startup loads the compacted file and replays the log.

pub mod error;
pub mod index;
pub mod reconciler;
pub mod serialization;
pub mod store;
pub mod wal;

pub use error::{StorageError, StorageResult};
pub use index::{SearchHit, VectorIndex};
pub use reconciler::{spawn_reconciler, ReconcilerHandle};
pub use serialization::SerializationError;
pub use store::{
    GraphState, GraphStore, LearnReceipt, StoreStats, ACCESS_STRENGTH_BOOST, SNAPSHOT_FILE,
    WAL_FILE,
};
