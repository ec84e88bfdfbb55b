//! Bidirectional association path search.
//!
//! Two level-synchronous frontiers grow toward each other: forward from the
//! start concepts along outgoing edges, backward from the target concepts
//! along incoming edges. Each keeps a visited-from map, so a meeting concept
//! identifies one forward and one backward partial path.

mod frontier;
mod search;
mod types;

pub use search::{find_path, find_paths};
pub use types::{Path, PathEdge, PathParams};
