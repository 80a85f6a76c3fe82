//! Transactional storage port for task records.
//!
//! Services never issue individual reads or writes against the store. Every
//! operation runs inside [`TaskStore::transaction`], which hands the closure a
//! [`TaskTransaction`] and commits only when the closure returns `Ok`.

use crate::task::domain::{ActorId, Task, TaskId, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Filter over the tasks created by one actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreatedTaskFilter {
    /// Restricts the count to one status.
    pub status: Option<TaskStatus>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
}

/// Task store contract.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Runs `op` inside a single store transaction.
    ///
    /// The transaction commits when `op` returns `Ok` and rolls back
    /// otherwise, so a failed cascade leaves no partial change behind.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `op`, or a [`TaskStoreError`] converted
    /// into `E` when the transaction cannot be opened or committed.
    async fn transaction<T, E, F>(&self, op: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static,
        F: FnOnce(&mut dyn TaskTransaction) -> Result<T, E> + Send + 'static;
}

/// Operations available inside an open store transaction.
///
/// Methods are synchronous; adapters backed by blocking drivers run the whole
/// transaction on a blocking thread.
pub trait TaskTransaction {
    /// Inserts a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the identifier exists.
    fn insert(&mut self, task: &Task) -> TaskStoreResult<()>;

    /// Persists the mutable fields (status, result, expiry) of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    fn save(&mut self, task: &Task) -> TaskStoreResult<()>;

    /// Reads a task without locking it.
    fn find(&mut self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Reads a task and holds an exclusive row lock on it until the
    /// transaction ends.
    fn lock(&mut self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Returns the earliest-created `submitted` task assigned to `assignee`,
    /// ignoring the identifiers in `skip`.
    fn next_claim_candidate(
        &mut self,
        assignee: &ActorId,
        skip: &[TaskId],
    ) -> TaskStoreResult<Option<TaskId>>;

    /// Locks and returns the direct children of `parent` whose status is in
    /// `statuses`.
    ///
    /// Callers hold the lock on `parent` first so locks are always taken from
    /// the root down.
    fn lock_children(
        &mut self,
        parent: TaskId,
        statuses: &[TaskStatus],
    ) -> TaskStoreResult<Vec<Task>>;

    /// Sets the status of every listed task and returns the number updated.
    fn set_status(&mut self, ids: &[TaskId], status: TaskStatus) -> TaskStoreResult<u64>;

    /// Counts the direct children of `parent`, optionally restricted to
    /// `statuses`.
    fn count_children(
        &mut self,
        parent: TaskId,
        statuses: Option<&[TaskStatus]>,
    ) -> TaskStoreResult<u64>;

    /// Counts the tasks assigned to `assignee` whose status is in `statuses`.
    fn count_assigned(&mut self, assignee: &ActorId, statuses: &[TaskStatus])
    -> TaskStoreResult<u64>;

    /// Returns every task of the tree rooted at `root`, oldest first.
    fn find_by_root(&mut self, root: TaskId) -> TaskStoreResult<Vec<Task>>;

    /// Returns the root tasks created by `actor`, oldest first.
    fn find_roots_created_by(&mut self, actor: &ActorId) -> TaskStoreResult<Vec<Task>>;

    /// Returns the distinct assignees of tasks whose status is in `statuses`.
    fn distinct_assignees(&mut self, statuses: &[TaskStatus]) -> TaskStoreResult<Vec<ActorId>>;

    /// Counts tasks created by `actor` that match `filter`.
    fn count_created_by(
        &mut self,
        actor: &ActorId,
        filter: &CreatedTaskFilter,
    ) -> TaskStoreResult<u64>;

    /// Counts tasks whose expiry is set and earlier than `now`.
    fn count_expired(&mut self, now: DateTime<Utc>) -> TaskStoreResult<u64>;

    /// Deletes tasks whose expiry is set and earlier than `now`, together
    /// with their subtrees, and returns the number of expired tasks removed.
    fn delete_expired(&mut self, now: DateTime<Utc>) -> TaskStoreResult<u64>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The statement or lock timeout elapsed.
    #[error("transaction timed out")]
    Timeout,

    /// The transaction lost a serialization conflict or deadlock.
    #[error("transaction conflict")]
    Conflict,

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
