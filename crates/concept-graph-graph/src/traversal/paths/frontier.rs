//! One side of the bidirectional search.

use std::collections::HashMap;

use concept_graph_core::types::ConceptId;

use super::types::PathEdge;
use crate::confidence::{from_inverse_sum, inverse};
use crate::traversal::AssociationSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Follows outgoing edges away from the start set.
    Forward,
    /// Follows incoming edges back from the target set.
    Backward,
}

/// How a frontier first reached a concept.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Visit {
    /// Edge to the neighbor one hop closer to this side's origin set.
    pub parent: Option<PathEdge>,
    pub hops: usize,
    /// Running `Σ 1/c` over the partial path.
    pub inverse_sum: f64,
}

impl Visit {
    fn confidence(&self) -> f64 {
        from_inverse_sum(self.hops, self.inverse_sum)
    }

    /// Fewer hops wins; at equal hops higher confidence wins.
    fn improves_on(&self, existing: &Visit) -> bool {
        self.hops < existing.hops
            || (self.hops == existing.hops && self.confidence() > existing.confidence())
    }
}

/// Level-synchronous frontier with an injective visited-from map.
///
/// Each concept maps to exactly one parent edge, so following parents from
/// any visited concept yields a single partial path back to the origin set.
pub(crate) struct Frontier {
    direction: Direction,
    visited: HashMap<ConceptId, Visit>,
    /// Visit order, for deterministic meeting-point iteration.
    order: Vec<ConceptId>,
    layer: Vec<ConceptId>,
    max_nodes: usize,
}

impl Frontier {
    pub fn new(direction: Direction, origins: &[ConceptId], max_nodes: usize) -> Self {
        let mut frontier = Self {
            direction,
            visited: HashMap::new(),
            order: Vec::new(),
            layer: Vec::new(),
            max_nodes,
        };
        for &id in origins {
            if !frontier.visited.contains_key(&id) {
                frontier.visited.insert(
                    id,
                    Visit {
                        parent: None,
                        hops: 0,
                        inverse_sum: 0.0,
                    },
                );
                frontier.order.push(id);
                frontier.layer.push(id);
            }
        }
        frontier
    }

    pub fn visit(&self, id: &ConceptId) -> Option<&Visit> {
        self.visited.get(id)
    }

    pub fn visited_in_order(&self) -> impl Iterator<Item = &ConceptId> {
        self.order.iter()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.layer.is_empty()
    }

    /// Expand the current layer by one hop. Returns how many concepts were
    /// newly visited.
    pub fn expand<S: AssociationSource + ?Sized>(&mut self, source: &S) -> usize {
        let layer = std::mem::take(&mut self.layer);
        let mut next = Vec::new();

        for id in layer {
            let Some(current) = self.visited.get(&id).copied() else {
                continue;
            };
            let edges = match self.direction {
                Direction::Forward => source.outgoing(&id),
                Direction::Backward => source.incoming(&id),
            };
            for edge in edges {
                let neighbor = match self.direction {
                    Direction::Forward => edge.target_id,
                    Direction::Backward => edge.source_id,
                };
                let candidate = Visit {
                    parent: Some(PathEdge::from(edge)),
                    hops: current.hops + 1,
                    inverse_sum: current.inverse_sum + inverse(edge.confidence),
                };
                match self.visited.get_mut(&neighbor) {
                    Some(existing) => {
                        if candidate.improves_on(existing) {
                            *existing = candidate;
                        }
                    }
                    None => {
                        if self.visited.len() >= self.max_nodes {
                            continue;
                        }
                        self.visited.insert(neighbor, candidate);
                        self.order.push(neighbor);
                        next.push(neighbor);
                    }
                }
            }
        }

        let added = next.len();
        self.layer = next;
        added
    }

    /// Edges from this side's origin to `id` (forward) or from `id` to this
    /// side's origin (backward), in path order.
    pub fn partial_path(&self, id: &ConceptId) -> Vec<PathEdge> {
        let mut edges = Vec::new();
        let mut current = *id;
        while let Some(edge) = self.visited.get(&current).and_then(|v| v.parent) {
            edges.push(edge);
            current = match self.direction {
                Direction::Forward => edge.source,
                Direction::Backward => edge.target,
            };
        }
        if self.direction == Direction::Forward {
            edges.reverse();
        }
        edges
    }
}
