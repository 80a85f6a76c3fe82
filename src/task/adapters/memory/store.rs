//! In-memory task store with transactional copy-on-write semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::task::{
    domain::{ActorId, Task, TaskId, TaskStatus},
    ports::{CreatedTaskFilter, TaskStore, TaskStoreError, TaskStoreResult, TaskTransaction},
};

/// Thread-safe in-memory task store.
///
/// Transactions are serialized behind one mutex and run against a copy of
/// the state that replaces the original only on success. Deleting an expired
/// task removes every task that references it as parent or root, matching
/// the foreign-key cascade of the relational schema.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryTaskState>>,
}

#[derive(Debug, Clone, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, StoredTask>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct StoredTask {
    task: Task,
    seq: u64,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn run<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<TaskStoreError>,
        F: FnOnce(&mut dyn TaskTransaction) -> Result<T, E>,
    {
        let mut guard = self.state.lock().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut working = guard.clone();
        let value = op(&mut InMemoryTransaction {
            state: &mut working,
        })?;
        *guard = working;
        Ok(value)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn transaction<T, E, F>(&self, op: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static,
        F: FnOnce(&mut dyn TaskTransaction) -> Result<T, E> + Send + 'static,
    {
        self.run(op)
    }
}

struct InMemoryTransaction<'a> {
    state: &'a mut InMemoryTaskState,
}

impl InMemoryTransaction<'_> {
    /// Tasks matching `predicate`, ordered by creation time then insertion.
    fn ordered<P>(&self, predicate: P) -> Vec<&StoredTask>
    where
        P: Fn(&Task) -> bool,
    {
        let mut matches: Vec<&StoredTask> = self
            .state
            .tasks
            .values()
            .filter(|stored| predicate(&stored.task))
            .collect();
        matches.sort_by_key(|stored| (stored.task.created_at(), stored.seq));
        matches
    }

    fn count<P>(&self, predicate: P) -> u64
    where
        P: Fn(&Task) -> bool,
    {
        let total = self
            .state
            .tasks
            .values()
            .filter(|stored| predicate(&stored.task))
            .count();
        u64::try_from(total).unwrap_or(u64::MAX)
    }
}

fn is_expired(task: &Task, now: DateTime<Utc>) -> bool {
    task.delete_at().is_some_and(|expiry| expiry < now)
}

impl TaskTransaction for InMemoryTransaction<'_> {
    fn insert(&mut self, task: &Task) -> TaskStoreResult<()> {
        if self.state.tasks.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }
        let seq = self.state.next_seq;
        self.state.next_seq += 1;
        self.state.tasks.insert(
            task.id(),
            StoredTask {
                task: task.clone(),
                seq,
            },
        );
        Ok(())
    }

    fn save(&mut self, task: &Task) -> TaskStoreResult<()> {
        let stored = self
            .state
            .tasks
            .get_mut(&task.id())
            .ok_or(TaskStoreError::NotFound(task.id()))?;
        stored.task = task.clone();
        Ok(())
    }

    fn find(&mut self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        Ok(self.state.tasks.get(&id).map(|stored| stored.task.clone()))
    }

    fn lock(&mut self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        self.find(id)
    }

    fn next_claim_candidate(
        &mut self,
        assignee: &ActorId,
        skip: &[TaskId],
    ) -> TaskStoreResult<Option<TaskId>> {
        let candidate = self
            .ordered(|task| {
                task.status() == TaskStatus::Submitted
                    && task.is_assignee(assignee)
                    && !skip.contains(&task.id())
            })
            .first()
            .map(|stored| stored.task.id());
        Ok(candidate)
    }

    fn lock_children(
        &mut self,
        parent: TaskId,
        statuses: &[TaskStatus],
    ) -> TaskStoreResult<Vec<Task>> {
        Ok(self
            .ordered(|task| {
                task.parent_task_id() == Some(parent) && statuses.contains(&task.status())
            })
            .into_iter()
            .map(|stored| stored.task.clone())
            .collect())
    }

    fn set_status(&mut self, ids: &[TaskId], status: TaskStatus) -> TaskStoreResult<u64> {
        let mut updated = 0;
        for id in ids {
            if let Some(stored) = self.state.tasks.get_mut(id) {
                // Bulk updates bypass the state machine, as a SQL UPDATE does.
                stored.task = force_status(stored.task.clone(), status);
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn count_children(
        &mut self,
        parent: TaskId,
        statuses: Option<&[TaskStatus]>,
    ) -> TaskStoreResult<u64> {
        Ok(self.count(|task| {
            task.parent_task_id() == Some(parent)
                && statuses.is_none_or(|wanted| wanted.contains(&task.status()))
        }))
    }

    fn count_assigned(
        &mut self,
        assignee: &ActorId,
        statuses: &[TaskStatus],
    ) -> TaskStoreResult<u64> {
        Ok(self.count(|task| task.is_assignee(assignee) && statuses.contains(&task.status())))
    }

    fn find_by_root(&mut self, root: TaskId) -> TaskStoreResult<Vec<Task>> {
        Ok(self
            .ordered(|task| task.root_task_id() == root)
            .into_iter()
            .map(|stored| stored.task.clone())
            .collect())
    }

    fn find_roots_created_by(&mut self, actor: &ActorId) -> TaskStoreResult<Vec<Task>> {
        Ok(self
            .ordered(|task| task.is_root() && task.is_creator(actor))
            .into_iter()
            .map(|stored| stored.task.clone())
            .collect())
    }

    fn distinct_assignees(&mut self, statuses: &[TaskStatus]) -> TaskStoreResult<Vec<ActorId>> {
        let assignees: BTreeSet<ActorId> = self
            .state
            .tasks
            .values()
            .filter(|stored| statuses.contains(&stored.task.status()))
            .map(|stored| stored.task.assignee().clone())
            .collect();
        Ok(assignees.into_iter().collect())
    }

    fn count_created_by(
        &mut self,
        actor: &ActorId,
        filter: &CreatedTaskFilter,
    ) -> TaskStoreResult<u64> {
        Ok(self.count(|task| {
            task.is_creator(actor)
                && filter.status.is_none_or(|status| task.status() == status)
                && filter
                    .created_from
                    .is_none_or(|from| task.created_at() >= from)
                && filter
                    .created_before
                    .is_none_or(|before| task.created_at() < before)
        }))
    }

    fn count_expired(&mut self, now: DateTime<Utc>) -> TaskStoreResult<u64> {
        Ok(self.count(|task| is_expired(task, now)))
    }

    fn delete_expired(&mut self, now: DateTime<Utc>) -> TaskStoreResult<u64> {
        let before = self.state.tasks.len();
        self.state
            .tasks
            .retain(|_, stored| !is_expired(&stored.task, now));
        let removed = before - self.state.tasks.len();

        loop {
            let orphans: Vec<TaskId> = self
                .state
                .tasks
                .values()
                .filter(|stored| {
                    let task = &stored.task;
                    let parent_missing = task
                        .parent_task_id()
                        .is_some_and(|parent| !self.state.tasks.contains_key(&parent));
                    let root_missing = !self.state.tasks.contains_key(&task.root_task_id());
                    parent_missing || root_missing
                })
                .map(|stored| stored.task.id())
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                self.state.tasks.remove(&id);
            }
        }

        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

fn force_status(task: Task, status: TaskStatus) -> Task {
    let mut data = task.into_persisted();
    data.status = status;
    Task::from_persisted(data)
}
