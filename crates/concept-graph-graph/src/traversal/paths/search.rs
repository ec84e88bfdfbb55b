//! Bidirectional multi-path search.

use std::collections::HashSet;

use concept_graph_core::types::ConceptId;
use tracing::debug;

use super::frontier::{Direction, Frontier};
use super::types::{Path, PathEdge, PathParams};
use crate::confidence::harmonic_mean;
use crate::traversal::AssociationSource;

/// Find up to `params.num_paths` simple paths from any of `start_ids` to any
/// of `target_ids`, each at most `params.max_depth` edges long.
///
/// The forward frontier expands outgoing edges from the start set for
/// `ceil(max_depth/2)` rounds and the backward frontier expands incoming
/// edges from the target set for `floor(max_depth/2)` rounds, alternating.
/// Every concept both frontiers reached is a meeting point; the forward
/// partial path joined with the backward partial path forms a candidate.
///
/// Candidates that revisit a concept are discarded and identical concept
/// sequences are kept once. Results are ordered by confidence descending,
/// then fewer edges, then concept ids lexicographically.
///
/// A start id that is also a target yields a zero-edge path with confidence
/// 1.0.
///
/// # Arguments
/// * `source` - Graph to search
/// * `start_ids` - Concepts a path may start at
/// * `target_ids` - Concepts a path may end at
/// * `params` - Depth, result count and work limits
///
/// # Returns
/// Paths in rank order; empty when none exists within `max_depth`.
pub fn find_paths<S: AssociationSource + ?Sized>(
    source: &S,
    start_ids: &[ConceptId],
    target_ids: &[ConceptId],
    params: &PathParams,
) -> Vec<Path> {
    if params.num_paths == 0 || start_ids.is_empty() || target_ids.is_empty() {
        return Vec::new();
    }

    let mut forward = Frontier::new(Direction::Forward, start_ids, params.max_nodes_per_side);
    let mut backward = Frontier::new(Direction::Backward, target_ids, params.max_nodes_per_side);

    let (mut forward_left, mut backward_left) = (params.forward_rounds(), params.backward_rounds());
    let mut forward_turn = true;
    while forward_left + backward_left > 0 {
        if forward_turn && forward_left > 0 {
            forward.expand(source);
            forward_left -= 1;
        } else if backward_left > 0 {
            backward.expand(source);
            backward_left -= 1;
        } else {
            forward.expand(source);
            forward_left -= 1;
        }
        forward_turn = !forward_turn;
        if forward.is_exhausted() && backward.is_exhausted() {
            break;
        }
    }

    let mut candidates: Vec<Path> = forward
        .visited_in_order()
        .filter(|id| backward.visit(id).is_some())
        .filter_map(|meeting| join(&forward, &backward, meeting))
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.edges.len().cmp(&b.edges.len()))
            .then_with(|| a.nodes.cmp(&b.nodes))
    });

    let mut seen: HashSet<Vec<ConceptId>> = HashSet::new();
    candidates.retain(|path| seen.insert(path.nodes.clone()));
    candidates.truncate(params.num_paths);

    debug!(
        starts = start_ids.len(),
        targets = target_ids.len(),
        forward_visited = forward.visited_count(),
        backward_visited = backward.visited_count(),
        found = candidates.len(),
        "Bidirectional path search complete"
    );
    candidates
}

/// Best single path from `start` to `end`, if one exists within `max_depth`.
pub fn find_path<S: AssociationSource + ?Sized>(
    source: &S,
    start: ConceptId,
    end: ConceptId,
    max_depth: usize,
) -> Option<Path> {
    let params = PathParams::with_depth(max_depth).num_paths(1);
    find_paths(source, &[start], &[end], &params).into_iter().next()
}

/// Join the partial paths at `meeting`; `None` if the result revisits a
/// concept.
fn join(forward: &Frontier, backward: &Frontier, meeting: &ConceptId) -> Option<Path> {
    let mut edges: Vec<PathEdge> = forward.partial_path(meeting);
    edges.extend(backward.partial_path(meeting));

    let mut nodes = Vec::with_capacity(edges.len() + 1);
    nodes.push(edges.first().map_or(*meeting, |e| e.source));
    nodes.extend(edges.iter().map(|e| e.target));

    let mut distinct = HashSet::with_capacity(nodes.len());
    if !nodes.iter().all(|id| distinct.insert(*id)) {
        return None;
    }

    Some(Path {
        confidence: harmonic_mean(edges.iter().map(|e| e.confidence)),
        nodes,
        edges,
    })
}
