//! Binary serialization for the compacted graph file.
//!
//! All multi-byte integers and floats are little-endian. The layout is fixed
//! so a file can be inspected with a hex dump and so a corrupt file is
//! detected rather than misread.
//!
//! # File Layout
//!
//! | Section | Size |
//! |---------|------|
//! | [`FileHeader`] | 40 bytes |
//! | concept records | 52 bytes + content + `4 * dim` each |
//! | edge records | 37 bytes each |
//!
//! # Example: Round-trip
//!
//! ```rust
//! use concept_graph_core::types::Concept;
//! use concept_graph_storage::serialization::{decode_snapshot, encode_snapshot};
//!
//! let concepts = vec![Concept::new("ice melts", 1.0, 0.8).with_embedding(vec![0.1, 0.2])];
//! let bytes = encode_snapshot(&concepts, &[], &[], 0, 7);
//! let snapshot = decode_snapshot(&bytes).unwrap();
//! assert_eq!(snapshot.concepts, concepts);
//! assert_eq!(snapshot.header.last_sequence, 7);
//! ```

mod concept;
mod edge;
mod embedding;
mod error;
mod header;
mod reader;
mod snapshot;

pub use self::concept::{encode_concept, CONCEPT_HEADER_LEN};
pub use self::edge::{encode_edge, EDGE_RECORD_LEN};
pub use self::embedding::{deserialize_embedding, serialize_embedding};
pub use self::error::SerializationError;
pub use self::header::{FileHeader, FORMAT_VERSION, HEADER_LEN, MAGIC};
pub use self::snapshot::{decode_snapshot, encode_snapshot, GraphSnapshot};
