//! HNSW graph: construction and search.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use concept_graph_core::config::IndexConfig;
use concept_graph_core::types::{validate_embedding, ConceptId, ValidationError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use super::scored::Scored;

/// Highest layer a node can be assigned to.
pub const MAX_LEVEL: usize = 16;

/// One search result: concept id and cosine similarity in `[-1, 1]`.
pub type SearchHit = (ConceptId, f32);

/// Hierarchical Navigable Small World index with cosine similarity.
///
/// Vectors are stored unit-normalized so similarity is a dot product. Levels
/// are drawn from a seeded `ChaCha8Rng`; inserting the same vectors in the
/// same order always builds the same graph and returns the same results.
///
/// # Example
///
/// ```rust
/// use concept_graph_core::config::IndexConfig;
/// use concept_graph_core::types::ConceptId;
/// use concept_graph_storage::index::VectorIndex;
///
/// let mut index = VectorIndex::new(IndexConfig::with_dimension(2));
/// let east = ConceptId::from_content("east");
/// index.insert(east, &[1.0, 0.0]).unwrap();
/// index.insert(ConceptId::from_content("north"), &[0.0, 1.0]).unwrap();
///
/// let hits = index.search(&[0.9, 0.1], 1).unwrap();
/// assert_eq!(hits[0].0, east);
/// ```
pub struct VectorIndex {
    config: IndexConfig,
    level_mult: f64,
    rng: ChaCha8Rng,
    ids: Vec<ConceptId>,
    vectors: Vec<Vec<f32>>,
    /// `links[node][layer]` holds neighbor slots on that layer.
    links: Vec<Vec<Vec<u32>>>,
    slots: HashMap<ConceptId, u32>,
    entry_point: Option<u32>,
    top_level: usize,
}

impl VectorIndex {
    pub fn new(config: IndexConfig) -> Self {
        let m = config.m.max(2) as f64;
        Self {
            level_mult: 1.0 / m.ln(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            ids: Vec::new(),
            vectors: Vec::new(),
            links: Vec::new(),
            slots: HashMap::new(),
            entry_point: None,
            top_level: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.slots.contains_key(id)
    }

    /// Indexed ids in insertion order.
    pub fn ids(&self) -> &[ConceptId] {
        &self.ids
    }

    /// Insert a vector. Re-inserting an existing id is a no-op and returns
    /// `Ok(false)`.
    ///
    /// # Errors
    ///
    /// `ValidationError` on dimension mismatch, non-finite values or the zero
    /// vector. The index is unchanged on error.
    pub fn insert(&mut self, id: ConceptId, embedding: &[f32]) -> Result<bool, ValidationError> {
        validate_embedding(embedding, self.config.dimension)?;
        if self.slots.contains_key(&id) {
            return Ok(false);
        }

        let vector = normalize(embedding);
        let level = self.sample_level();
        let node = self.ids.len() as u32;
        self.ids.push(id);
        self.vectors.push(vector);
        self.links.push(vec![Vec::new(); level + 1]);
        self.slots.insert(id, node);

        let Some(mut entry) = self.entry_point else {
            self.entry_point = Some(node);
            self.top_level = level;
            return Ok(true);
        };

        let query = self.vectors[node as usize].clone();
        for layer in (level + 1..=self.top_level).rev() {
            entry = self.greedy_closest(&query, entry, layer);
        }

        let mut entries = vec![entry];
        for layer in (0..=level.min(self.top_level)).rev() {
            let candidates = self.search_layer(&query, &entries, self.config.ef_construction, layer);
            let cap = self.layer_capacity(layer);
            let selected: Vec<u32> = candidates.iter().take(cap).map(|s| s.node).collect();

            for &neighbor in &selected {
                self.links[neighbor as usize][layer].push(node);
                if self.links[neighbor as usize][layer].len() > cap {
                    self.prune(neighbor, layer, cap);
                }
            }
            self.links[node as usize][layer] = selected;
            entries = candidates.into_iter().map(|s| s.node).collect();
        }

        if level > self.top_level {
            self.top_level = level;
            self.entry_point = Some(node);
        }
        trace!(id = %id, level, size = self.ids.len(), "Indexed embedding");
        Ok(true)
    }

    /// Top-`k` most similar concepts using the configured `ef_search`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, ValidationError> {
        self.search_with_ef(query, k, self.config.ef_search)
    }

    /// Top-`k` most similar concepts, sorted by similarity descending (ties
    /// by id).
    ///
    /// Returns at most `k` results. An empty index yields an empty result.
    /// When `k` covers the whole index, or the index is at or below the exact
    /// scan threshold, every entry is scored directly.
    pub fn search_with_ef(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchHit>, ValidationError> {
        validate_embedding(query, self.config.dimension)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(mut entry) = self.entry_point else {
            return Ok(Vec::new());
        };
        let query = normalize(query);

        let scored: Vec<Scored> = if k >= self.len() || self.len() <= self.config.exact_threshold {
            (0..self.len() as u32)
                .map(|node| Scored {
                    similarity: self.similarity(&query, node),
                    node,
                })
                .collect()
        } else {
            for layer in (1..=self.top_level).rev() {
                entry = self.greedy_closest(&query, entry, layer);
            }
            self.search_layer(&query, &[entry], ef_search.max(k), 0)
        };

        let mut hits: Vec<SearchHit> = scored
            .into_iter()
            .map(|s| (self.ids[s.node as usize], s.similarity))
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
    }

    fn layer_capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.m * 2
        } else {
            self.config.m
        }
    }

    fn sample_level(&mut self) -> usize {
        let draw: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let level = (-draw.ln() * self.level_mult).floor() as usize;
        level.min(MAX_LEVEL)
    }

    fn similarity(&self, query: &[f32], node: u32) -> f32 {
        dot(query, &self.vectors[node as usize])
    }

    /// Hill-climb on one layer until no neighbor improves.
    fn greedy_closest(&self, query: &[f32], mut current: u32, layer: usize) -> u32 {
        let mut best = self.similarity(query, current);
        loop {
            let mut improved = false;
            for &neighbor in self.neighbors(current, layer) {
                let sim = self.similarity(query, neighbor);
                if sim > best {
                    best = sim;
                    current = neighbor;
                    improved = true;
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search on one layer. Returns up to `ef` nodes, best first.
    fn search_layer(&self, query: &[f32], entries: &[u32], ef: usize, layer: usize) -> Vec<Scored> {
        let mut visited = vec![false; self.len()];
        let mut candidates: BinaryHeap<Scored> = BinaryHeap::new();
        let mut results: BinaryHeap<Reverse<Scored>> = BinaryHeap::new();

        for &node in entries {
            if std::mem::replace(&mut visited[node as usize], true) {
                continue;
            }
            let scored = Scored {
                similarity: self.similarity(query, node),
                node,
            };
            candidates.push(scored);
            results.push(Reverse(scored));
            if results.len() > ef {
                results.pop();
            }
        }

        while let Some(current) = candidates.pop() {
            let worst = results.peek().map_or(f32::NEG_INFINITY, |r| r.0.similarity);
            if current.similarity < worst && results.len() >= ef {
                break;
            }
            for &neighbor in self.neighbors(current.node, layer) {
                if std::mem::replace(&mut visited[neighbor as usize], true) {
                    continue;
                }
                let scored = Scored {
                    similarity: self.similarity(query, neighbor),
                    node: neighbor,
                };
                let worst = results.peek().map_or(f32::NEG_INFINITY, |r| r.0.similarity);
                if results.len() < ef || scored.similarity > worst {
                    candidates.push(scored);
                    results.push(Reverse(scored));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<Scored> = results.into_iter().map(|r| r.0).collect();
        out.sort_by(|a, b| b.cmp(a));
        out
    }

    fn neighbors(&self, node: u32, layer: usize) -> &[u32] {
        self.links[node as usize]
            .get(layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Keep the `cap` most similar neighbors of `node` on `layer`.
    fn prune(&mut self, node: u32, layer: usize, cap: usize) {
        let base = &self.vectors[node as usize];
        let mut scored: Vec<Scored> = self.links[node as usize][layer]
            .iter()
            .map(|&n| Scored {
                similarity: dot(base, &self.vectors[n as usize]),
                node: n,
            })
            .collect();
        scored.sort_by(|a, b| b.cmp(a));
        scored.truncate(cap);
        self.links[node as usize][layer] = scored.into_iter().map(|s| s.node).collect();
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

#[cfg(test)]
impl VectorIndex {
    pub(crate) fn top_level_for_test(&self) -> usize {
        self.top_level
    }
}
