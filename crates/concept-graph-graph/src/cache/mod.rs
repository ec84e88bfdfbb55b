//! Reasoning result cache using moka.
//!
//! Results are keyed by an xxhash64 fingerprint of the normalized query token
//! set plus the query parameters, so reorderings and case changes of the same
//! question share one entry. Each entry remembers its token set; learning new
//! content invalidates only the entries whose tokens overlap it.

mod stats;


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use concept_graph_core::config::CacheConfig;
use concept_graph_core::{token_overlap, TokenSet};
use moka::sync::Cache;
use tracing::{debug, info, trace};
use xxhash_rust::xxh64::Xxh64;

pub use stats::CacheStats;

/// Cache key: xxhash64 fingerprint of a normalized query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(pub u64);

impl CacheKey {
    /// Fingerprint a query.
    ///
    /// Tokens are hashed in set order, each followed by a zero byte so
    /// `["ab", "c"]` and `["a", "bc"]` differ. The query vector, when
    /// present, contributes its exact bit patterns.
    pub fn fingerprint(
        tokens: &TokenSet,
        query_vector: Option<&[f32]>,
        max_depth: usize,
        num_paths: usize,
    ) -> Self {
        let mut hasher = Xxh64::new(0);
        for token in tokens {
            hasher.update(token.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&(max_depth as u64).to_le_bytes());
        hasher.update(&(num_paths as u64).to_le_bytes());
        if let Some(vector) = query_vector {
            hasher.update(&[1]);
            for value in vector {
                hasher.update(&value.to_bits().to_le_bytes());
            }
        }
        Self(hasher.digest())
    }

    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

struct CachedQuery<V> {
    value: V,
    tokens: TokenSet,
}

/// Token-aware result cache.
///
/// Stores `Arc`s so hits are cheap clones. Never cleared as a side effect of
/// learning: [`QueryCache::invalidate_overlapping`] removes only the entries
/// whose share of tokens found in the new content exceeds
/// `overlap_threshold`.
pub struct QueryCache<V> {
    inner: Cache<CacheKey, Arc<CachedQuery<V>>>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
    /// Bumped by every invalidation pass.
    generation: AtomicU64,
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache. A disabled config yields a cache where every lookup
    /// misses and every insert is a no-op.
    pub fn new(config: CacheConfig) -> Self {
        if !config.enabled {
            info!("Query cache DISABLED by config");
        }
        let inner = Cache::builder()
            .max_capacity(config.max_entries.max(1))
            .build();

        info!(
            enabled = config.enabled,
            max_entries = config.max_entries,
            overlap_threshold = config.overlap_threshold,
            "Query cache initialized"
        );

        Self {
            inner,
            config,
            stats: Arc::new(CacheStats::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Cached result for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if !self.config.enabled {
            return None;
        }
        match self.inner.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                trace!(key = %key, "Cache HIT");
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                trace!(key = %key, "Cache MISS");
                None
            }
        }
    }

    /// Store `value` under `key`, remembering the query's token set for
    /// later invalidation.
    pub fn put(&self, key: CacheKey, value: V, tokens: TokenSet) {
        if !self.config.enabled {
            return;
        }
        self.stats.record_insertion();
        self.inner.insert(key, Arc::new(CachedQuery { value, tokens }));
        trace!(key = %key, "Cache INSERT");
    }

    /// Current invalidation generation.
    ///
    /// Read it before computing a result and pass it to
    /// [`put_if_current`](Self::put_if_current).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store `value` only if no invalidation ran since `observed` was read
    /// from [`generation`](Self::generation).
    ///
    /// A result computed while new content was being learned may predate
    /// that content, and the invalidation pass may have run before the
    /// result existed. Such results are not cached. An invalidation racing
    /// the insert itself is caught by re-checking afterwards.
    ///
    /// # Returns
    /// True if the entry was kept.
    pub fn put_if_current(&self, key: CacheKey, value: V, tokens: TokenSet, observed: u64) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.generation() != observed {
            trace!(key = %key, "Cache INSERT skipped: invalidated during computation");
            return false;
        }
        self.put(key, value, tokens);
        if self.generation() != observed {
            self.inner.invalidate(&key);
            trace!(key = %key, "Cache INSERT withdrawn: invalidated during insert");
            return false;
        }
        true
    }

    /// Remove every entry whose token overlap with `learned` exceeds the
    /// configured threshold.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn invalidate_overlapping(&self, learned: &TokenSet) -> usize {
        if !self.config.enabled || learned.is_empty() {
            return 0;
        }

        // Bump before scanning so a concurrent `put_if_current` either sees
        // the new generation or inserts before the scan reaches its key.
        self.generation.fetch_add(1, Ordering::SeqCst);
        let threshold = self.config.overlap_threshold;
        let stale: Vec<Arc<CacheKey>> = self
            .inner
            .iter()
            .filter(|(_, entry)| token_overlap(&entry.tokens, learned) > threshold)
            .map(|(key, _)| key)
            .collect();

        for key in &stale {
            self.inner.invalidate(key.as_ref());
        }
        if !stale.is_empty() {
            self.stats.record_invalidations(stale.len() as u64);
            debug!(removed = stale.len(), "Invalidated overlapping cache entries");
        }
        stale.len()
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
        info!("Cache CLEARED");
    }

    /// Number of live entries after running moka's pending maintenance.
    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
