//! Sub-configuration structures for Concept Graph components.
//!
//! This module contains the individual configuration structs that make up
//! the main `Config` structure.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Wire protocol server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// TCP port (default: 7420)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted frame payload in bytes (default: 16 MiB).
    /// Larger length prefixes are answered with a protocol error.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Maximum concurrent connections (default: 64)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7420
}

fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_max_connections() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_frame_bytes: default_max_frame_bytes(),
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// Validate the server configuration.
    ///
    /// FAIL FAST: returns the first violated rule.
    pub fn validate(&self) -> CoreResult<()> {
        if self.bind_address.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "server.bind_address must not be empty".into(),
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(CoreError::ConfigError(
                "server.max_frame_bytes must be greater than 0".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(CoreError::ConfigError(
                "server.max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// `bind_address:port` as a string.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Persistent store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the compacted file and the write-ahead log.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// fsync the write-ahead log before acknowledging each write.
    #[serde(default = "default_sync_every_write")]
    pub sync_every_write: bool,

    /// Background reconciliation period in milliseconds.
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_sync_every_write() -> bool {
    true
}

fn default_reconcile_interval_ms() -> u64 {
    5_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sync_every_write: default_sync_every_write(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
        }
    }
}

/// Vector index (HNSW) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Embedding dimension every concept vector must have.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Max neighbors per node on upper layers (layer 0 keeps 2*m).
    #[serde(default = "default_m")]
    pub m: usize,

    /// Beam width during insertion.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,

    /// Default beam width during search.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,

    /// At or below this many entries search is an exact scan.
    #[serde(default = "default_exact_threshold")]
    pub exact_threshold: usize,

    /// Seed for level assignment; fixed so replay rebuilds the same graph.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_dimension() -> usize {
    384
}

fn default_m() -> usize {
    16
}

fn default_ef_construction() -> usize {
    100
}

fn default_ef_search() -> usize {
    64
}

fn default_exact_threshold() -> usize {
    32
}

fn default_seed() -> u64 {
    0x00C0_FFEE
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            m: default_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
            exact_threshold: default_exact_threshold(),
            seed: default_seed(),
        }
    }
}

impl IndexConfig {
    /// Config with a specific dimension and defaults elsewhere.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.dimension == 0 {
            return Err(CoreError::ConfigError(
                "index.dimension must be greater than 0".into(),
            ));
        }
        if self.m < 2 {
            return Err(CoreError::ConfigError(format!(
                "index.m must be at least 2, got {}",
                self.m
            )));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(CoreError::ConfigError(
                "index.ef_construction and index.ef_search must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Query result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Whether reasoning results are cached at all.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Maximum cached results.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,

    /// An entry is invalidated when the share of its tokens found in newly
    /// learned content exceeds this value. 0.0 means any shared token.
    #[serde(default)]
    pub overlap_threshold: f32,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_entries() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_entries: default_cache_max_entries(),
            overlap_threshold: 0.0,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.enabled && self.max_entries == 0 {
            return Err(CoreError::ConfigError(
                "cache.max_entries must be greater than 0 when the cache is enabled".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(CoreError::ConfigError(format!(
                "cache.overlap_threshold must be in [0, 1], got {}",
                self.overlap_threshold
            )));
        }
        Ok(())
    }
}

/// Multi-hop reasoning limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningConfig {
    /// Depth used when a request does not specify one.
    #[serde(default = "default_max_depth")]
    pub default_max_depth: usize,

    /// Paths returned when a request does not specify a count.
    #[serde(default = "default_num_paths")]
    pub default_num_paths: usize,

    /// Upper bound on concepts visited per search frontier.
    #[serde(default = "default_max_nodes_per_side")]
    pub max_nodes_per_side: usize,

    /// Upper bound on seed concepts taken per query token or vector search.
    #[serde(default = "default_seed_limit")]
    pub seed_limit: usize,

    /// Hard ceiling on requested depth.
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
}

fn default_max_depth() -> usize {
    4
}

fn default_num_paths() -> usize {
    3
}

fn default_max_nodes_per_side() -> usize {
    10_000
}

fn default_seed_limit() -> usize {
    8
}

fn default_depth_limit() -> usize {
    16
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            default_max_depth: default_max_depth(),
            default_num_paths: default_num_paths(),
            max_nodes_per_side: default_max_nodes_per_side(),
            seed_limit: default_seed_limit(),
            depth_limit: default_depth_limit(),
        }
    }
}

impl ReasoningConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_nodes_per_side == 0 || self.seed_limit == 0 {
            return Err(CoreError::ConfigError(
                "reasoning.max_nodes_per_side and reasoning.seed_limit must be greater than 0"
                    .into(),
            ));
        }
        if self.default_max_depth > self.depth_limit {
            return Err(CoreError::ConfigError(format!(
                "reasoning.default_max_depth ({}) exceeds reasoning.depth_limit ({})",
                self.default_max_depth, self.depth_limit
            )));
        }
        Ok(())
    }
}

/// Association extraction from free text.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Longest phrase chunk in tokens; longer runs are split.
    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,

    /// Each token links to this many following tokens in its chunk.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Strength given to concepts learned from text.
    #[serde(default = "default_extracted_strength")]
    pub concept_strength: f32,
}

fn default_max_chunk_tokens() -> usize {
    6
}

fn default_window() -> usize {
    2
}

fn default_extracted_strength() -> f32 {
    1.0
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: default_max_chunk_tokens(),
            window: default_window(),
            concept_strength: default_extracted_strength(),
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_chunk_tokens == 0 || self.window == 0 {
            return Err(CoreError::ConfigError(
                "extraction.max_chunk_tokens and extraction.window must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
