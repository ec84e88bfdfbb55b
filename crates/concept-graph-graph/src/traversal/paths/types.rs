//! Path search parameters and results.

use concept_graph_core::types::{Association, AssociationType, ConceptId};
use serde::{Deserialize, Serialize};

/// Parameters for bidirectional path search.
#[derive(Debug, Clone)]
pub struct PathParams {
    /// Maximum edges in a returned path (default: 4).
    pub max_depth: usize,

    /// Maximum paths returned (default: 3).
    pub num_paths: usize,

    /// Maximum concepts each frontier may visit (default: 10000).
    /// Prevents runaway traversal on dense graphs.
    pub max_nodes_per_side: usize,
}

impl Default for PathParams {
    fn default() -> Self {
        Self {
            max_depth: 4,
            num_paths: 3,
            max_nodes_per_side: 10_000,
        }
    }
}

impl PathParams {
    /// Create params with specific max depth.
    #[must_use]
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    /// Builder: set max depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder: set number of paths.
    #[must_use]
    pub fn num_paths(mut self, count: usize) -> Self {
        self.num_paths = count;
        self
    }

    /// Builder: set per-frontier node limit.
    #[must_use]
    pub fn max_nodes_per_side(mut self, nodes: usize) -> Self {
        self.max_nodes_per_side = nodes;
        self
    }

    /// Forward rounds: `ceil(max_depth / 2)`.
    pub fn forward_rounds(&self) -> usize {
        self.max_depth.div_ceil(2)
    }

    /// Backward rounds: `floor(max_depth / 2)`.
    pub fn backward_rounds(&self) -> usize {
        self.max_depth / 2
    }
}

/// One traversed edge of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathEdge {
    pub source: ConceptId,
    pub target: ConceptId,
    pub assoc_type: AssociationType,
    pub confidence: f32,
}

impl From<&Association> for PathEdge {
    fn from(edge: &Association) -> Self {
        Self {
            source: edge.source_id,
            target: edge.target_id,
            assoc_type: edge.assoc_type,
            confidence: edge.confidence,
        }
    }
}

/// A simple path from a start concept to a target concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Concepts along the path, start first. One more than `edges`.
    pub nodes: Vec<ConceptId>,
    pub edges: Vec<PathEdge>,
    /// Harmonic mean of edge confidences; 1.0 for a zero-edge path.
    pub confidence: f32,
}

impl Path {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn start(&self) -> Option<ConceptId> {
        self.nodes.first().copied()
    }

    pub fn end(&self) -> Option<ConceptId> {
        self.nodes.last().copied()
    }
}
