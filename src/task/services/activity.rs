//! In-memory index of actors that currently hold active work.

use super::background::{StartMode, run_periodic};
use crate::task::{
    domain::{ActorId, TaskStatus},
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Set of actors with at least one submitted, working or waiting task.
///
/// Incremental updates keep the set close to the store between resyncs; a
/// full resync replaces it wholesale. The lock is held only for a single
/// insert, removal or swap, and a poisoned lock is recovered since every
/// write leaves the set in a valid state.
#[derive(Debug, Default)]
pub struct ActivityIndex {
    actors: RwLock<HashSet<ActorId>>,
}

impl ActivityIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `actor` holds active work.
    pub fn add(&self, actor: &ActorId) {
        self.write().insert(actor.clone());
    }

    /// Records that `actor` holds no active work.
    pub fn remove(&self, actor: &ActorId) {
        self.write().remove(actor);
    }

    /// Returns `true` when `actor` is indexed.
    #[must_use]
    pub fn contains(&self, actor: &ActorId) -> bool {
        self.read().contains(actor)
    }

    /// Returns a point-in-time copy of the indexed actors.
    #[must_use]
    pub fn snapshot(&self) -> HashSet<ActorId> {
        self.read().clone()
    }

    /// Returns the indexed actors that appear in `filter`.
    ///
    /// An empty filter returns the whole snapshot.
    #[must_use]
    pub fn snapshot_filtered(&self, filter: &[ActorId]) -> HashSet<ActorId> {
        let actors = self.read();
        if filter.is_empty() {
            return actors.clone();
        }
        filter
            .iter()
            .filter(|actor| actors.contains(*actor))
            .cloned()
            .collect()
    }

    /// Atomically replaces the indexed actors.
    pub fn replace(&self, actors: impl IntoIterator<Item = ActorId>) {
        let fresh: HashSet<ActorId> = actors.into_iter().collect();
        *self.write() = fresh;
    }

    /// Rebuilds the index from the distinct assignees of active tasks.
    ///
    /// Returns the number of indexed actors.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when the store query fails; the current
    /// contents are kept in that case.
    pub async fn full_resync<S>(&self, store: &S) -> TaskStoreResult<usize>
    where
        S: TaskStore,
    {
        let assignees = store
            .transaction(|tx| tx.distinct_assignees(&TaskStatus::ACTIVE))
            .await?;
        let total = assignees.len();
        self.replace(assignees);
        Ok(total)
    }

    /// Creates an index primed from the store.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when the initial resync fails.
    pub async fn init<S>(store: &S) -> Result<Arc<Self>, TaskStoreError>
    where
        S: TaskStore,
    {
        let index = Arc::new(Self::new());
        let total = index.full_resync(store).await?;
        tracing::info!(actors = total, "activity index primed");
        Ok(index)
    }

    /// Spawns a job that resyncs the index every `interval` until `cancel`
    /// fires. The first resync happens after one interval.
    pub fn start_resync<S>(
        self: &Arc<Self>,
        store: Arc<S>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        S: TaskStore + 'static,
    {
        let index = Arc::clone(self);
        tokio::spawn(async move {
            run_periodic(
                "activity-resync",
                interval,
                cancel,
                StartMode::AfterInterval,
                || {
                    let cycle_index = Arc::clone(&index);
                    let cycle_store = Arc::clone(&store);
                    async move {
                        match cycle_index.full_resync(&*cycle_store).await {
                            Ok(total) => tracing::debug!(actors = total, "activity index resynced"),
                            Err(err) => tracing::error!(error = %err, "activity index resync failed"),
                        }
                    }
                },
            )
            .await;
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<ActorId>> {
        self.actors.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<ActorId>> {
        self.actors.write().unwrap_or_else(PoisonError::into_inner)
    }
}
