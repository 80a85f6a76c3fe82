//! Retention sweep removing tasks past their expiry.

use super::background::{StartMode, run_periodic};
use crate::task::ports::{TaskStore, TaskStoreResult};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired tasks removed, not counting subtasks removed with them.
    pub removed: u64,
}

/// Deletes tasks whose `delete_at` lies in the past.
pub struct RetentionSweeper<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> RetentionSweeper<S, C>
where
    S: TaskStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a sweeper over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Runs one sweep at the current clock time.
    ///
    /// # Errors
    ///
    /// Returns the store error; nothing is deleted in that case.
    pub async fn sweep(&self) -> TaskStoreResult<SweepReport> {
        self.sweep_at(self.clock.utc()).await
    }

    /// Runs one sweep treating `now` as the current time.
    ///
    /// Counting and deletion share one transaction; a sweep that finds no
    /// expired task issues no delete.
    ///
    /// # Errors
    ///
    /// Returns the store error; nothing is deleted in that case.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> TaskStoreResult<SweepReport> {
        let removed = self
            .store
            .transaction(move |tx| -> TaskStoreResult<u64> {
                if tx.count_expired(now)? == 0 {
                    return Ok(0);
                }
                tx.delete_expired(now)
            })
            .await?;
        if removed > 0 {
            tracing::info!(removed, %now, "expired tasks deleted");
        } else {
            tracing::debug!(%now, "no expired tasks");
        }
        Ok(SweepReport { removed })
    }

    /// Spawns the periodic sweep. The first sweep runs immediately.
    pub fn spawn(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            run_periodic("retention-sweep", interval, cancel, StartMode::Immediately, || {
                let sweeper = Arc::clone(&self);
                async move {
                    if let Err(err) = sweeper.sweep().await {
                        tracing::error!(error = %err, "retention sweep failed");
                    }
                }
            })
            .await;
        })
    }
}
