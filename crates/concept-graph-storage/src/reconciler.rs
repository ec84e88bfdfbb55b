//! Background reconciliation worker.
//!
//! Periodically folds the write-ahead log into the compacted file. The flush
//! itself is blocking file I/O and runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::store::GraphStore;

/// Handle to a running reconciler. Dropping it without calling
/// [`shutdown`](Self::shutdown) leaves the task running until the runtime
/// stops.
pub struct ReconcilerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    store: Arc<GraphStore>,
}

/// Start reconciling `store` every `interval` while it has pending changes.
///
/// Must be called from within a tokio runtime.
pub fn spawn_reconciler(store: Arc<GraphStore>, interval: Duration) -> ReconcilerHandle {
    let (stop, mut stopped) = watch::channel(false);
    let worker_store = Arc::clone(&store);

    let task = tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Background reconciler started"
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                // Only `shutdown` sends, and a dropped sender also ends the loop.
                _ = stopped.changed() => break,
            }

            if !worker_store.needs_reconcile() {
                debug!("Reconciler tick: nothing pending");
                continue;
            }
            let store = Arc::clone(&worker_store);
            match tokio::task::spawn_blocking(move || store.flush()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Background reconciliation failed"),
                Err(e) => error!(error = %e, "Reconciliation task panicked"),
            }
        }

        info!("Background reconciler stopped");
    });

    ReconcilerHandle { stop, task, store }
}

impl ReconcilerHandle {
    /// Stop the worker, wait for it, then run a final flush if anything is
    /// still pending.
    ///
    /// # Errors
    ///
    /// The final flush's error, or `StorageError::Reconciliation` if the
    /// flush task panicked or was cancelled.
    pub async fn shutdown(self) -> StorageResult<()> {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Reconciler task ended abnormally");
        }
        if !self.store.needs_reconcile() {
            return Ok(());
        }
        let store = self.store;
        final_flush_outcome(tokio::task::spawn_blocking(move || store.flush()).await)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn final_flush_outcome(joined: Result<StorageResult<()>, JoinError>) -> StorageResult<()> {
    joined.unwrap_or_else(|e| {
        error!(error = %e, "Final reconciliation task panicked");
        Err(StorageError::Reconciliation(format!(
            "final flush did not complete: {}",
            e
        )))
    })
}
