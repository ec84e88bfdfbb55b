//! Graph traversal over stored associations.
//!
//! The path engine works against the [`AssociationSource`] trait so it can
//! run over the store's locked state or over an ad-hoc graph in tests.

pub mod paths;

use concept_graph_core::types::{Association, ConceptId};
use concept_graph_storage::GraphState;

pub use paths::{find_path, find_paths, Path, PathEdge, PathParams};

/// Read-only access to directed associations.
pub trait AssociationSource {
    /// Edges leaving `id`, in a stable order.
    fn outgoing<'a>(&'a self, id: &ConceptId) -> Box<dyn Iterator<Item = &'a Association> + 'a>;

    /// Edges arriving at `id`, in a stable order.
    fn incoming<'a>(&'a self, id: &ConceptId) -> Box<dyn Iterator<Item = &'a Association> + 'a>;
}

impl AssociationSource for GraphState {
    fn outgoing<'a>(&'a self, id: &ConceptId) -> Box<dyn Iterator<Item = &'a Association> + 'a> {
        Box::new(GraphState::outgoing(self, id))
    }

    fn incoming<'a>(&'a self, id: &ConceptId) -> Box<dyn Iterator<Item = &'a Association> + 'a> {
        Box::new(GraphState::incoming(self, id))
    }
}
