//! Persistent graph store.
//!
//! [`GraphStore`] owns the data directory:
//!
//! - `graph.cgdb`: the compacted graph file (see [`crate::serialization`])
//! - `graph.wal`: the write-ahead log of mutations since the last
//!   reconciliation
//!
//! Every mutation is validated, logged, then applied to the in-memory graph
//! under the write lock, so reads in the same process see it immediately.
//! Reconciliation writes the compacted file and truncates the log.

mod state;
mod stats;

#[cfg(test)]
mod tests;

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Instant;

use chrono::Utc;
use concept_graph_core::config::{IndexConfig, StorageConfig};
use concept_graph_core::types::{
    validate_confidence, validate_content, validate_embedding, validate_strength, Association,
    AssociationType, Concept, ConceptId, ValidationError,
};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, error, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::index::SearchHit;
use crate::serialization::{decode_snapshot, encode_snapshot};
use crate::wal::{WalEntry, WalOp, WriteAheadLog};

pub use state::{GraphState, ACCESS_STRENGTH_BOOST};
pub use stats::StoreStats;

use state::ConceptApplied;
use stats::StoreCounters;

/// Compacted graph file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "graph.cgdb";

/// Write-ahead log file name inside the data directory.
pub const WAL_FILE: &str = "graph.wal";

/// Acknowledgement of a concept write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnReceipt {
    pub id: ConceptId,
    /// Log sequence assigned to the write.
    pub sequence: u64,
    /// False when the content was already stored and the write merged.
    pub created: bool,
}

/// Durable, concurrently readable concept graph.
///
/// # Example
///
/// ```rust
/// use concept_graph_core::config::{IndexConfig, StorageConfig};
/// use concept_graph_storage::GraphStore;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = GraphStore::open(dir.path(), StorageConfig::default(), IndexConfig::with_dimension(2)).unwrap();
/// let receipt = store.learn_concept("salt dissolves in water", None, 1.0, 0.9).unwrap();
/// assert_eq!(store.get_concept(&receipt.id).unwrap().content, "salt dissolves in water");
/// ```
pub struct GraphStore {
    dir: PathBuf,
    config: StorageConfig,
    dimension: usize,
    state: RwLock<GraphState>,
    wal: Mutex<WriteAheadLog>,
    counters: StoreCounters,
    opened_at: Instant,
}

impl GraphStore {
    /// Open or create a store in `dir`.
    ///
    /// Loads the compacted file if present, rebuilds the graph in file order
    /// and the vector index in its recorded insertion order, then replays log
    /// entries newer than the file.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` if the directory or files cannot be accessed
    /// - `StorageError::Serialization` if the compacted file is malformed
    /// - `StorageError::Corrupted` if file and log disagree
    pub fn open(
        dir: impl AsRef<Path>,
        config: StorageConfig,
        index_config: IndexConfig,
    ) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| StorageError::io(format!("creating {}", dir.display()), e))?;

        let dimension = index_config.dimension;
        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let mut state = if snapshot_path.exists() {
            let bytes = fs::read(&snapshot_path).map_err(|e| {
                StorageError::io(format!("reading {}", snapshot_path.display()), e)
            })?;
            GraphState::from_snapshot(decode_snapshot(&bytes)?, index_config)?
        } else {
            GraphState::new(index_config)
        };

        let stale_tmp = tmp_path(&snapshot_path);
        if stale_tmp.exists() {
            warn!(path = %stale_tmp.display(), "Removing incomplete compacted file");
            let _ = fs::remove_file(&stale_tmp);
        }

        let (wal, entries) = WriteAheadLog::open(dir.join(WAL_FILE), config.sync_every_write)?;
        let snapshot_sequence = state.last_sequence;
        let mut replayed = 0u64;
        for entry in entries {
            // Entries at or below the file's sequence survived a crash between
            // rename and truncate; they are already in the file.
            if entry.sequence <= snapshot_sequence {
                continue;
            }
            state.apply(entry.sequence, &entry.op)?;
            replayed += 1;
        }

        let counters = StoreCounters::default();
        counters.pending.store(replayed, Ordering::Relaxed);

        info!(
            dir = %dir.display(),
            concepts = state.concept_count(),
            edges = state.edge_count(),
            replayed,
            "Opened graph store"
        );

        Ok(Self {
            dir,
            config,
            dimension,
            state: RwLock::new(state),
            wal: Mutex::new(wal),
            counters,
            opened_at: Instant::now(),
        })
    }

    /// Learn a concept.
    ///
    /// Re-learning stored content is idempotent: the id is unchanged, strength
    /// becomes the maximum of old and new, and an embedding is attached only
    /// if the concept had none.
    ///
    /// # Errors
    ///
    /// `StorageError::Validation` before anything is logged; `StorageError::Io`
    /// if the log append fails, in which case nothing is applied.
    pub fn learn_concept(
        &self,
        content: &str,
        embedding: Option<&[f32]>,
        strength: f32,
        confidence: f32,
    ) -> StorageResult<LearnReceipt> {
        self.learn_concept_with_id(None, content, embedding, strength, confidence)
    }

    /// Learn a concept whose id the caller claims to know.
    ///
    /// A `supplied_id` that differs from the content-derived id is rejected
    /// as `ValidationError::IdMismatch` before anything is logged.
    pub fn learn_concept_with_id(
        &self,
        supplied_id: Option<ConceptId>,
        content: &str,
        embedding: Option<&[f32]>,
        strength: f32,
        confidence: f32,
    ) -> StorageResult<LearnReceipt> {
        self.validate_concept(supplied_id, content, embedding, strength, confidence)
            .map_err(|e| self.reject("learn_concept", e))?;

        let created_millis = Utc::now().timestamp_millis();
        let mut state = self.state.write();
        let sequence = self.append_locked(
            &mut state,
            WalOp::LearnConcept {
                content: content.to_string(),
                embedding: embedding.map(<[f32]>::to_vec),
                strength,
                confidence,
                created_millis,
            },
        )?;
        let applied =
            state.apply_concept(content, embedding, strength, confidence, created_millis)?;
        let id = ConceptId::from_content(content);
        debug!(id = %id, sequence, ?applied, "Learned concept");

        Ok(LearnReceipt {
            id,
            sequence,
            created: applied == ConceptApplied::Created,
        })
    }

    /// Learn a directed association. Both endpoints must already exist.
    ///
    /// A duplicate `(source, target, type)` keeps the higher confidence.
    pub fn learn_association(
        &self,
        source_id: ConceptId,
        target_id: ConceptId,
        assoc_type: AssociationType,
        confidence: f32,
    ) -> StorageResult<u64> {
        validate_confidence("confidence", confidence)
            .map_err(|e| self.reject("learn_association", e))?;

        let mut state = self.state.write();
        for (role, id) in [("source", source_id), ("target", target_id)] {
            if !state.contains(&id) {
                return Err(self.reject(
                    "learn_association",
                    ValidationError::MissingEndpoint {
                        role: role.to_string(),
                        id,
                    },
                ));
            }
        }

        let sequence = self.append_locked(
            &mut state,
            WalOp::LearnAssociation {
                source_id,
                target_id,
                assoc_type,
                confidence,
            },
        )?;
        state.merge_edge(Association::new(source_id, target_id, assoc_type, confidence));
        debug!(source = %source_id, target = %target_id, %assoc_type, sequence, "Learned association");
        Ok(sequence)
    }

    /// Concept by id. A pure read: access statistics are not touched.
    pub fn get_concept(&self, id: &ConceptId) -> Option<Concept> {
        self.state.read().get_concept(id)
    }

    /// Count an access: increments `access_count` and raises `strength` by
    /// [`ACCESS_STRENGTH_BOOST`]. Returns false for an unknown id.
    ///
    /// Runs under the shared lock. The change becomes durable at the next
    /// reconciliation.
    pub fn record_access(&self, id: &ConceptId) -> bool {
        let hit = self.state.read().record_access(id);
        if hit {
            self.counters.access_dirty.store(true, Ordering::Relaxed);
        }
        hit
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.state.read().contains(id)
    }

    /// Distinct outgoing targets in insertion order.
    pub fn get_neighbors(&self, id: &ConceptId) -> Vec<ConceptId> {
        self.state.read().neighbors(id)
    }

    /// Distinct incoming sources in insertion order.
    pub fn get_incoming(&self, id: &ConceptId) -> Vec<ConceptId> {
        self.state.read().incoming_neighbors(id)
    }

    pub fn outgoing_associations(&self, id: &ConceptId) -> Vec<Association> {
        self.state.read().outgoing(id).copied().collect()
    }

    pub fn incoming_associations(&self, id: &ConceptId) -> Vec<Association> {
        self.state.read().incoming(id).copied().collect()
    }

    pub fn concepts_with_token(&self, token: &str) -> Vec<ConceptId> {
        self.state.read().concepts_with_token(token).to_vec()
    }

    pub fn concept_ids(&self) -> Vec<ConceptId> {
        self.state.read().concept_ids()
    }

    /// Top-`k` concepts by cosine similarity to `query`.
    ///
    /// `ef_search` overrides the configured beam width when given.
    pub fn search_similar(
        &self,
        query: &[f32],
        k: usize,
        ef_search: Option<usize>,
    ) -> StorageResult<Vec<SearchHit>> {
        let state = self.state.read();
        let hits = match ef_search {
            Some(ef) => state.index().search_with_ef(query, k, ef)?,
            None => state.index().search(query, k)?,
        };
        Ok(hits)
    }

    /// Shared read access to the whole graph for multi-step reads such as
    /// path search. Writers wait while the guard is held.
    pub fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read()
    }

    /// Reconcile now: write the compacted file and truncate the log.
    ///
    /// Holds the upgradable lock, so readers continue and writers wait.
    ///
    /// # Errors
    ///
    /// `StorageError::Io` if any step fails; the log is left intact and the
    /// in-memory graph is unchanged.
    pub fn flush(&self) -> StorageResult<()> {
        let started = Instant::now();
        let state = self.state.upgradable_read();
        let pending = self.counters.pending.load(Ordering::Relaxed);

        let bytes = encode_snapshot(
            &state.concepts(),
            state.edges(),
            state.index().ids(),
            Utc::now().timestamp_millis().max(state.last_write_millis),
            state.last_sequence,
        );
        let snapshot_path = self.snapshot_path();
        if let Err(e) = write_atomically(&snapshot_path, &bytes) {
            error!(path = %snapshot_path.display(), error = %e, "Reconciliation failed");
            return Err(e);
        }
        if let Err(e) = self.wal.lock().truncate() {
            error!(error = %e, "Truncating write-ahead log failed after reconciliation");
            return Err(e);
        }
        self.counters.record_reconciled();

        info!(
            concepts = state.concept_count(),
            edges = state.edge_count(),
            reconciled = pending,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reconciled graph store"
        );
        Ok(())
    }

    /// True when there are logged or access-only changes not yet in the
    /// compacted file.
    pub fn needs_reconcile(&self) -> bool {
        self.counters.pending.load(Ordering::Relaxed) > 0
            || self.counters.access_dirty.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            concepts: state.concept_count() as u64,
            edges: state.edge_count() as u64,
            written: self.counters.written.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            pending: self.counters.pending.load(Ordering::Relaxed),
            reconciliations: self.counters.reconciliations.load(Ordering::Relaxed),
            uptime: self.opened_at.elapsed(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.dir.join(WAL_FILE)
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn validate_concept(
        &self,
        supplied_id: Option<ConceptId>,
        content: &str,
        embedding: Option<&[f32]>,
        strength: f32,
        confidence: f32,
    ) -> Result<(), ValidationError> {
        validate_content(content)?;
        if let Some(supplied) = supplied_id {
            let derived = ConceptId::from_content(content);
            if supplied != derived {
                return Err(ValidationError::IdMismatch { supplied, derived });
            }
        }
        validate_strength(strength)?;
        validate_confidence("confidence", confidence)?;
        if let Some(embedding) = embedding {
            validate_embedding(embedding, self.dimension)?;
        }
        Ok(())
    }

    /// Count a write rejected by validation as dropped and wrap the error.
    ///
    /// Callers that validate composite writes themselves use this so every
    /// rejected write shows up in [`StoreStats::dropped`].
    pub fn reject(&self, operation: &'static str, err: ValidationError) -> StorageError {
        self.counters.record_dropped();
        warn!(operation, error = %err, "Dropped invalid write");
        StorageError::Validation(err)
    }

    /// Log `op` under the caller's write lock and advance the sequence.
    fn append_locked(&self, state: &mut GraphState, op: WalOp) -> StorageResult<u64> {
        let sequence = state.last_sequence + 1;
        let entry = WalEntry { sequence, op };
        if let Err(e) = self.wal.lock().append(&entry) {
            error!(sequence, error = %e, "Write-ahead append failed");
            return Err(e);
        }
        state.last_sequence = sequence;
        state.last_write_millis = Utc::now().timestamp_millis();
        self.counters.record_written();
        Ok(sequence)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write to `<path>.tmp`, fsync, rename over `path`, fsync the directory.
fn write_atomically(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let tmp = tmp_path(path);
    let result = (|| {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| StorageError::io(format!("creating {}", tmp.display()), e))?;
        file.write_all(bytes)
            .map_err(|e| StorageError::io(format!("writing {}", tmp.display()), e))?;
        file.sync_all()
            .map_err(|e| StorageError::io(format!("syncing {}", tmp.display()), e))?;
        fs::rename(&tmp, path)
            .map_err(|e| StorageError::io(format!("renaming {}", tmp.display()), e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
        return result;
    }
    if let Some(parent) = path.parent() {
        if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
            debug!(error = %e, "Directory fsync unavailable");
        }
    }
    Ok(())
}
