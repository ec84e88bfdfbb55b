//! Knowledge engine: the store, the path engine and the query cache behind
//! one handle.
//!
//! Every write goes to the store first and then invalidates the cached
//! reasoning results whose tokens overlap the new content. Reads go straight
//! to the store.

use std::collections::HashSet;
use std::sync::Arc;

use concept_graph_core::types::{
    validate_confidence, validate_content, validate_strength, AssociationType, Concept, ConceptId,
    ValidationError,
};
use concept_graph_core::{normalize_tokens, tokenize, Config, TokenSet};
use concept_graph_storage::{GraphState, GraphStore, LearnReceipt, SearchHit, StoreStats};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{CacheKey, QueryCache};
use crate::error::{GraphError, GraphResult};
use crate::extraction::{extract_associations, ExtractionPlan};
use crate::traversal::{find_path, find_paths, Path, PathParams};

/// Answer to a reasoning query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// Concepts matched by the query's tokens or vector, start set first.
    pub seeds: Vec<ConceptId>,
    /// Best paths from the start set to the remaining seeds, in rank order.
    pub paths: Vec<Path>,
    /// Best path confidence, or the best seed confidence without a path.
    /// 0.0 when nothing matched.
    pub confidence: f32,
    /// True when served from the query cache.
    pub cached: bool,
}

/// Outcome of [`KnowledgeEngine::learn_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnTextOutcome {
    /// Distinct concepts extracted from the text.
    pub concepts: u64,
    /// Distinct associations extracted from the text.
    pub associations: u64,
    /// Concepts that did not exist before.
    pub created: u64,
    /// Log sequence of the last write; 0 if nothing was written.
    pub last_sequence: u64,
}

/// Store and cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub store: StoreStats,
    pub cache_entries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_invalidations: u64,
}

/// Persistent knowledge graph with cached multi-hop reasoning.
///
/// # Example
///
/// ```rust
/// use concept_graph_core::Config;
/// use concept_graph_core::types::AssociationType;
/// use concept_graph_graph::KnowledgeEngine;
///
/// let dir = tempfile::tempdir().unwrap();
/// let mut config = Config::default();
/// config.storage.data_dir = dir.path().display().to_string();
/// config.index.dimension = 2;
///
/// let engine = KnowledgeEngine::open(config).unwrap();
/// let moon = engine.learn_concept("moon gravity", None, 1.0, 0.9).unwrap();
/// let tides = engine.learn_concept("ocean tides", None, 1.0, 0.9).unwrap();
/// engine
///     .learn_association(moon.id, tides.id, AssociationType::Causal, 0.8)
///     .unwrap();
///
/// let result = engine.reason("moon tides", None, None, None).unwrap();
/// assert_eq!(result.paths.len(), 1);
/// assert!((result.confidence - 0.8).abs() < 1e-6);
/// ```
pub struct KnowledgeEngine {
    store: Arc<GraphStore>,
    cache: QueryCache<ReasoningResult>,
    config: Config,
}

impl KnowledgeEngine {
    /// Validate `config` and open the store in `config.storage.data_dir`.
    pub fn open(config: Config) -> GraphResult<Self> {
        config.validate()?;
        let store = GraphStore::open(
            &config.storage.data_dir,
            config.storage.clone(),
            config.index.clone(),
        )?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Wrap an already opened store.
    pub fn with_store(store: Arc<GraphStore>, config: Config) -> Self {
        let cache = QueryCache::new(config.cache.clone());
        info!(
            concepts = store.stats().concepts,
            cache_enabled = cache.is_enabled(),
            "Knowledge engine ready"
        );
        Self {
            store,
            cache,
            config,
        }
    }

    /// Learn a concept and invalidate cached results that share its tokens.
    pub fn learn_concept(
        &self,
        content: &str,
        embedding: Option<&[f32]>,
        strength: f32,
        confidence: f32,
    ) -> GraphResult<LearnReceipt> {
        self.learn_concept_with_id(None, content, embedding, strength, confidence)
    }

    /// [`learn_concept`](Self::learn_concept) with a caller-supplied id that
    /// must match the content-derived one.
    pub fn learn_concept_with_id(
        &self,
        supplied_id: Option<ConceptId>,
        content: &str,
        embedding: Option<&[f32]>,
        strength: f32,
        confidence: f32,
    ) -> GraphResult<LearnReceipt> {
        let receipt = self.store.learn_concept_with_id(
            supplied_id,
            content,
            embedding,
            strength,
            confidence,
        )?;
        self.cache.invalidate_overlapping(&normalize_tokens(content));
        Ok(receipt)
    }

    /// Learn an association and invalidate cached results that share tokens
    /// with either endpoint.
    pub fn learn_association(
        &self,
        source_id: ConceptId,
        target_id: ConceptId,
        assoc_type: AssociationType,
        confidence: f32,
    ) -> GraphResult<u64> {
        let sequence = self
            .store
            .learn_association(source_id, target_id, assoc_type, confidence)?;

        let mut tokens = TokenSet::new();
        for id in [source_id, target_id] {
            if let Some(concept) = self.store.get_concept(&id) {
                tokens.extend(normalize_tokens(&concept.content));
            }
        }
        self.cache.invalidate_overlapping(&tokens);
        Ok(sequence)
    }

    /// Extract concepts and associations from `text` and learn them.
    ///
    /// Extracted concepts get `extraction.concept_strength` and
    /// `confidence`; so do the associations between them. Unlike a single
    /// concept, the text itself is not size-limited.
    ///
    /// Every extracted concept is validated before the first write, so a
    /// rejected text leaves the store untouched. If a write fails part way,
    /// cached results overlapping the text are still invalidated.
    pub fn learn_text(&self, text: &str, confidence: f32) -> GraphResult<LearnTextOutcome> {
        let extraction = &self.config.extraction;
        if text.trim().is_empty() {
            return Err(self.store.reject("learn_text", ValidationError::EmptyContent).into());
        }
        validate_confidence("confidence", confidence)
            .and_then(|()| validate_strength(extraction.concept_strength))
            .map_err(|e| self.store.reject("learn_text", e))?;

        let plan = extract_associations(text, extraction);
        if let Some(err) = plan.concepts.iter().find_map(|token| validate_content(token).err()) {
            return Err(self.store.reject("learn_text", err).into());
        }

        let mut outcome = LearnTextOutcome {
            concepts: plan.concepts.len() as u64,
            associations: plan.associations.len() as u64,
            created: 0,
            last_sequence: 0,
        };
        let applied = self.apply_plan(&plan, confidence, &mut outcome);
        self.cache.invalidate_overlapping(&normalize_tokens(text));
        applied?;

        debug!(
            concepts = outcome.concepts,
            associations = outcome.associations,
            created = outcome.created,
            "Learned text"
        );
        Ok(outcome)
    }

    fn apply_plan(
        &self,
        plan: &ExtractionPlan,
        confidence: f32,
        outcome: &mut LearnTextOutcome,
    ) -> GraphResult<()> {
        let strength = self.config.extraction.concept_strength;
        for token in &plan.concepts {
            let receipt = self.store.learn_concept(token, None, strength, confidence)?;
            outcome.created += u64::from(receipt.created);
            outcome.last_sequence = receipt.sequence;
        }
        for edge in &plan.associations {
            outcome.last_sequence = self.store.learn_association(
                ConceptId::from_content(&edge.source),
                ConceptId::from_content(&edge.target),
                edge.assoc_type,
                confidence,
            )?;
        }
        Ok(())
    }

    /// Answer a query with paths between the concepts it mentions.
    ///
    /// Seeds come from the token index, one group per query token in query
    /// order, plus the nearest concepts to `query_vector` when given. The
    /// first matched group and the vector hits form the start set; the other
    /// groups form the target set. `None` depth or count takes the
    /// configured default.
    ///
    /// # Errors
    ///
    /// - `GraphError::InvalidParameter` if the depth exceeds
    ///   `reasoning.depth_limit` or the query has neither tokens nor vector
    /// - `GraphError::Validation` if the vector has the wrong dimension
    pub fn reason(
        &self,
        query: &str,
        query_vector: Option<&[f32]>,
        max_depth: Option<usize>,
        num_paths: Option<usize>,
    ) -> GraphResult<ReasoningResult> {
        let reasoning = &self.config.reasoning;
        let max_depth = self.checked_depth(max_depth)?;
        let num_paths = num_paths.unwrap_or(reasoning.default_num_paths);

        let tokens = normalize_tokens(query);
        if tokens.is_empty() && query_vector.is_none() {
            return Err(GraphError::InvalidParameter {
                name: "query",
                reason: "query has no searchable tokens and no vector".into(),
            });
        }

        // Vector-only queries are not cached: no tokens would ever
        // invalidate them.
        let cacheable = !tokens.is_empty();
        let key = CacheKey::fingerprint(&tokens, query_vector, max_depth, num_paths);
        if cacheable {
            if let Some(mut hit) = self.cache.get(&key) {
                hit.cached = true;
                debug!(key = %key, "Reasoning served from cache");
                return Ok(hit);
            }
        }

        // Read before the graph so learning that lands after the read lock
        // is released keeps this result out of the cache.
        let generation = self.cache.generation();
        let result = {
            let state = self.store.read();
            let (start, targets) = self.seed_sets(&state, query, query_vector)?;
            let paths = if targets.is_empty() {
                Vec::new()
            } else {
                let params = PathParams::with_depth(max_depth)
                    .num_paths(num_paths)
                    .max_nodes_per_side(reasoning.max_nodes_per_side);
                find_paths(&*state, &start, &targets, &params)
            };

            let mut seeds = start;
            seeds.extend(targets);
            let confidence = match paths.first() {
                Some(best) => best.confidence,
                None => seeds
                    .iter()
                    .filter_map(|id| state.concept_confidence(id))
                    .fold(0.0_f32, f32::max),
            };
            ReasoningResult {
                seeds,
                paths,
                confidence,
                cached: false,
            }
        };

        if let Some(best) = result.paths.first() {
            for id in &best.nodes {
                self.store.record_access(id);
            }
        }
        debug!(
            seeds = result.seeds.len(),
            paths = result.paths.len(),
            confidence = result.confidence,
            "Reasoned over query"
        );

        if cacheable {
            self.cache
                .put_if_current(key, result.clone(), tokens, generation);
        }
        Ok(result)
    }

    /// Start and target sets for a query, each deduplicated in match order.
    /// Concepts in the start set are not repeated as targets.
    fn seed_sets(
        &self,
        state: &GraphState,
        query: &str,
        query_vector: Option<&[f32]>,
    ) -> GraphResult<(Vec<ConceptId>, Vec<ConceptId>)> {
        let limit = self.config.reasoning.seed_limit;
        let mut seen_tokens = HashSet::new();
        let mut groups = tokenize(query)
            .into_iter()
            .filter(|token| seen_tokens.insert(token.clone()))
            .map(|token| {
                state
                    .concepts_with_token(&token)
                    .iter()
                    .take(limit)
                    .copied()
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty());

        let mut taken = HashSet::new();
        let mut start: Vec<ConceptId> = groups
            .next()
            .unwrap_or_default()
            .into_iter()
            .filter(|id| taken.insert(*id))
            .collect();
        if let Some(vector) = query_vector {
            let hits = state.index().search(vector, limit)?;
            start.extend(hits.into_iter().map(|(id, _)| id).filter(|id| taken.insert(*id)));
        }
        let targets = groups.flatten().filter(|id| taken.insert(*id)).collect();
        Ok((start, targets))
    }

    /// Best single path between two concepts.
    pub fn find_path(
        &self,
        start: ConceptId,
        end: ConceptId,
        max_depth: Option<usize>,
    ) -> GraphResult<Option<Path>> {
        let max_depth = self.checked_depth(max_depth)?;
        let state = self.store.read();
        Ok(find_path(&*state, start, end, max_depth))
    }

    /// Nearest concepts to `query` by cosine similarity.
    pub fn vector_search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: Option<usize>,
    ) -> GraphResult<Vec<SearchHit>> {
        Ok(self.store.search_similar(query, k, ef_search)?)
    }

    /// Look up a concept on behalf of a client, counting the access.
    pub fn query_concept(&self, id: &ConceptId) -> Option<Concept> {
        if !self.store.record_access(id) {
            return None;
        }
        self.store.get_concept(id)
    }

    pub fn get_neighbors(&self, id: &ConceptId) -> Vec<ConceptId> {
        self.store.get_neighbors(id)
    }

    /// Reconcile the log into the compacted file now.
    pub fn flush(&self) -> GraphResult<()> {
        Ok(self.store.flush()?)
    }

    pub fn stats(&self) -> EngineStats {
        let cache = self.cache.stats();
        EngineStats {
            store: self.store.stats(),
            cache_entries: self.cache.len(),
            cache_hits: cache.hits(),
            cache_misses: cache.misses(),
            cache_invalidations: cache.invalidations(),
        }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn cache(&self) -> &QueryCache<ReasoningResult> {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn checked_depth(&self, requested: Option<usize>) -> GraphResult<usize> {
        let reasoning = &self.config.reasoning;
        let depth = requested.unwrap_or(reasoning.default_max_depth);
        if depth > reasoning.depth_limit {
            return Err(GraphError::InvalidParameter {
                name: "max_depth",
                reason: format!("{} exceeds the limit of {}", depth, reasoning.depth_limit),
            });
        }
        Ok(depth)
    }
}
