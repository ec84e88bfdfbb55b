//! Store counters.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Distinct concepts in memory.
    pub concepts: u64,
    /// Distinct `(source, target, type)` edges in memory.
    pub edges: u64,
    /// Mutations accepted and logged since open.
    pub written: u64,
    /// Mutations rejected by validation since open.
    pub dropped: u64,
    /// Logged mutations not yet folded into the compacted file.
    pub pending: u64,
    /// Completed reconciliations since open.
    pub reconciliations: u64,
    /// Time since the store was opened.
    pub uptime: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    pub written: AtomicU64,
    pub dropped: AtomicU64,
    pub pending: AtomicU64,
    pub reconciliations: AtomicU64,
    /// Set by access tracking, which changes state without logging.
    pub access_dirty: AtomicBool,
}

impl StoreCounters {
    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconciled(&self) {
        self.pending.store(0, Ordering::Relaxed);
        self.access_dirty.store(false, Ordering::Relaxed);
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }
}
