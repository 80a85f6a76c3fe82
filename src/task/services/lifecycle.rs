//! Service layer orchestrating task creation, claiming and resolution.

use super::{
    activity::ActivityIndex,
    cascade, claim,
    error::{TaskAction, TaskLifecycleError, TaskLifecycleResult},
};
use crate::task::{
    domain::{
        ActorId, Credentials, StatsPeriod, Task, TaskDomainError, TaskDraft, TaskId, TaskStats,
        TaskStatus, TaskSummary,
    },
    ports::{CreatedTaskFilter, TaskNotification, TaskNotifier, TaskStore},
};
use chrono::{DateTime, Months, Utc};
use mockable::Clock;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

/// Default retention applied to tasks created without an explicit expiry.
pub const DEFAULT_RETENTION: Months = Months::new(3);

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTaskRequest {
    description: String,
    assignee: String,
    parent_id: Option<TaskId>,
    delete_at: Option<DateTime<Utc>>,
    credentials: Option<Value>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(description: impl Into<String>, assignee: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            assignee: assignee.into(),
            parent_id: None,
            delete_at: None,
            credentials: None,
        }
    }

    /// Makes the new task a subtask of `parent_id`.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets an explicit expiry.
    #[must_use]
    pub const fn with_delete_at(mut self, delete_at: DateTime<Utc>) -> Self {
        self.delete_at = Some(delete_at);
        self
    }

    /// Attaches a credentials payload of shape `{"service": {"VAR": "value"}}`.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Value) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Request payload for completing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteTaskRequest {
    task_id: TaskId,
    result: String,
    delete_at: Option<DateTime<Utc>>,
}

impl CompleteTaskRequest {
    /// Creates a request completing `task_id` with `result`.
    #[must_use]
    pub fn new(task_id: TaskId, result: impl Into<String>) -> Self {
        Self {
            task_id,
            result: result.into(),
            delete_at: None,
        }
    }

    /// Replaces the task expiry on completion.
    #[must_use]
    pub const fn with_delete_at(mut self, delete_at: DateTime<Utc>) -> Self {
        self.delete_at = Some(delete_at);
        self
    }

    /// Returns the target task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }
}

/// Request payload for failing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailTaskRequest {
    task_id: TaskId,
    reason: String,
}

impl FailTaskRequest {
    /// Creates a request failing `task_id` for `reason`.
    #[must_use]
    pub fn new(task_id: TaskId, reason: impl Into<String>) -> Self {
        Self {
            task_id,
            reason: reason.into(),
        }
    }

    /// Returns the target task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }
}

/// Committed effects of a resolving operation.
struct Resolution {
    task: Task,
    canceled: Vec<Task>,
    reopened: Option<Task>,
}

/// Task lifecycle orchestration service.
pub struct TaskLifecycleService<S, N, C>
where
    S: TaskStore,
    N: TaskNotifier,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    notifier: Arc<N>,
    index: Arc<ActivityIndex>,
    clock: Arc<C>,
    retention: Months,
}

impl<S, N, C> Clone for TaskLifecycleService<S, N, C>
where
    S: TaskStore,
    N: TaskNotifier,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            index: Arc::clone(&self.index),
            clock: Arc::clone(&self.clock),
            retention: self.retention,
        }
    }
}

impl<S, N, C> TaskLifecycleService<S, N, C>
where
    S: TaskStore + 'static,
    N: TaskNotifier + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        index: Arc<ActivityIndex>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            notifier,
            index,
            clock,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Sets the retention applied to tasks created without an expiry.
    #[must_use]
    pub fn with_retention(mut self, retention: Months) -> Self {
        self.retention = retention;
        self
    }

    /// Returns the activity index maintained by this service.
    #[must_use]
    pub const fn activity_index(&self) -> &Arc<ActivityIndex> {
        &self.index
    }

    /// Creates a task, moving its parent to `waiting` when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] for a blank description or
    /// assignee, malformed credentials, or an absent or inactive parent, and
    /// [`TaskLifecycleError::Store`] when persistence fails.
    #[instrument(skip_all, fields(actor = %actor))]
    pub async fn create_task(
        &self,
        actor: &ActorId,
        request: CreateTaskRequest,
    ) -> TaskLifecycleResult<Task> {
        let CreateTaskRequest {
            description,
            assignee,
            parent_id,
            delete_at,
            credentials,
        } = request;
        let draft = TaskDraft {
            created_by: actor.clone(),
            assignee: ActorId::new(assignee)?,
            description,
            delete_at,
            credentials: credentials
                .map(Credentials::from_json)
                .transpose()?
                .unwrap_or_default(),
        };
        let retention = self.retention;
        let clock = Arc::clone(&self.clock);

        let task = self
            .store
            .transaction(move |tx| -> TaskLifecycleResult<Task> {
                let Some(parent_id) = parent_id else {
                    let task = Task::new_root(draft, retention, &*clock)?;
                    tx.insert(&task)?;
                    return Ok(task);
                };
                let mut parent = tx
                    .lock(parent_id)?
                    .ok_or(TaskDomainError::ParentNotFound(parent_id))?;
                let task = Task::new_child(draft, &parent, retention, &*clock)?;
                parent.transition_to(TaskStatus::Waiting)?;
                tx.save(&parent)?;
                tx.insert(&task)?;
                Ok(task)
            })
            .await?;

        tracing::info!(
            task_id = %task.id(),
            assignee = %task.assignee(),
            parent_id = ?task.parent_task_id(),
            "task created"
        );
        self.announce(&task).await;
        Ok(task)
    }

    /// Claims the oldest submitted task assigned to `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NothingToClaim`] when no task is
    /// available and [`TaskLifecycleError::Store`] when persistence fails.
    #[instrument(skip_all, fields(actor = %actor))]
    pub async fn claim_next(&self, actor: &ActorId) -> TaskLifecycleResult<Task> {
        let claimant = actor.clone();
        let task = self
            .store
            .transaction(move |tx| claim::claim_next(tx, &claimant))
            .await?;
        tracing::info!(task_id = %task.id(), "task claimed");
        Ok(task)
    }

    /// Completes a working task, canceling its active descendants and
    /// reopening the parent once every sibling is resolved.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task,
    /// [`TaskLifecycleError::Forbidden`] unless `actor` is the assignee, and
    /// [`TaskLifecycleError::Domain`] for a blank result or a task that is
    /// not working.
    #[instrument(skip_all, fields(actor = %actor, task_id = %request.task_id()))]
    pub async fn complete_task(
        &self,
        actor: &ActorId,
        request: CompleteTaskRequest,
    ) -> TaskLifecycleResult<Task> {
        let caller = actor.clone();
        let CompleteTaskRequest {
            task_id,
            result,
            delete_at,
        } = request;

        let resolution = self
            .store
            .transaction(move |tx| -> TaskLifecycleResult<Resolution> {
                let mut task = cascade::lock_with_parent(tx, task_id)?;
                ensure_assignee(&task, &caller, TaskAction::Complete)?;
                task.complete(result, delete_at)?;
                tx.save(&task)?;
                let canceled = cascade::cancel_descendants(tx, task.id())?;
                let reopened = cascade::roll_up_parent(tx, &task)?;
                Ok(Resolution {
                    task,
                    canceled,
                    reopened,
                })
            })
            .await?;

        tracing::info!(
            canceled = resolution.canceled.len(),
            parent_reopened = resolution.reopened.is_some(),
            "task completed"
        );
        self.publish(&resolution).await;
        Ok(resolution.task)
    }

    /// Fails a working task. The parent is left as it is.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task,
    /// [`TaskLifecycleError::Forbidden`] unless `actor` is the assignee, and
    /// [`TaskLifecycleError::Domain`] for a blank reason or a task that is
    /// not working.
    #[instrument(skip_all, fields(actor = %actor, task_id = %request.task_id()))]
    pub async fn fail_task(
        &self,
        actor: &ActorId,
        request: FailTaskRequest,
    ) -> TaskLifecycleResult<Task> {
        let caller = actor.clone();
        let FailTaskRequest { task_id, reason } = request;

        let resolution = self
            .store
            .transaction(move |tx| -> TaskLifecycleResult<Resolution> {
                let mut task = cascade::lock_with_parent(tx, task_id)?;
                ensure_assignee(&task, &caller, TaskAction::Fail)?;
                task.fail(&reason)?;
                tx.save(&task)?;
                Ok(Resolution {
                    task,
                    canceled: Vec::new(),
                    reopened: None,
                })
            })
            .await?;

        tracing::info!("task failed");
        self.publish(&resolution).await;
        Ok(resolution.task)
    }

    /// Cancels a task on behalf of its assignee or creator, with the same
    /// descendant cascade and parent rollup as completion.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task,
    /// [`TaskLifecycleError::Forbidden`] unless `actor` is the assignee or the
    /// creator, and [`TaskLifecycleError::Domain`] when the task is already
    /// completed, failed or canceled.
    #[instrument(skip_all, fields(actor = %actor, task_id = %task_id))]
    pub async fn cancel_task(&self, actor: &ActorId, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let caller = actor.clone();

        let resolution = self
            .store
            .transaction(move |tx| -> TaskLifecycleResult<Resolution> {
                let mut task = cascade::lock_with_parent(tx, task_id)?;
                if !task.is_assignee(&caller) && !task.is_creator(&caller) {
                    return Err(forbidden(&task, &caller, TaskAction::Cancel));
                }
                task.cancel()?;
                tx.save(&task)?;
                let canceled = cascade::cancel_descendants(tx, task.id())?;
                let reopened = cascade::roll_up_parent(tx, &task)?;
                Ok(Resolution {
                    task,
                    canceled,
                    reopened,
                })
            })
            .await?;

        tracing::info!(
            canceled = resolution.canceled.len(),
            parent_reopened = resolution.reopened.is_some(),
            "task canceled"
        );
        self.publish(&resolution).await;
        Ok(resolution.task)
    }

    /// Lists every task of the tree rooted at `root_id`, oldest first, with
    /// credentials removed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when `root_id` does not name a
    /// root task and [`TaskLifecycleError::Forbidden`] unless `actor` created
    /// it.
    #[instrument(skip_all, fields(actor = %actor, root_id = %root_id))]
    pub async fn list_tasks_by_root(
        &self,
        actor: &ActorId,
        root_id: TaskId,
    ) -> TaskLifecycleResult<Vec<Task>> {
        let caller = actor.clone();
        self.store
            .transaction(move |tx| -> TaskLifecycleResult<Vec<Task>> {
                let root = tx
                    .find(root_id)?
                    .filter(Task::is_root)
                    .ok_or(TaskLifecycleError::NotFound(root_id))?;
                if !root.is_creator(&caller) {
                    return Err(forbidden(&root, &caller, TaskAction::ListTree));
                }
                let tree = tx.find_by_root(root_id)?;
                Ok(tree.into_iter().map(Task::redacted).collect())
            })
            .await
    }

    /// Summarizes the root tasks created by `actor`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] when persistence fails.
    #[instrument(skip_all, fields(actor = %actor))]
    pub async fn list_root_tasks_of(&self, actor: &ActorId) -> TaskLifecycleResult<Vec<TaskSummary>> {
        let creator = actor.clone();
        let roots = self
            .store
            .transaction(move |tx| tx.find_roots_created_by(&creator))
            .await?;
        Ok(roots.iter().map(Task::summary).collect())
    }

    /// Returns the actors currently holding active work, sorted.
    ///
    /// A non-empty `filter` restricts the answer to the listed actors.
    #[must_use]
    pub fn active_actors(&self, filter: &[ActorId]) -> Vec<ActorId> {
        let mut actors: Vec<ActorId> = self.index.snapshot_filtered(filter).into_iter().collect();
        actors.sort();
        actors
    }

    /// Computes statistics over the tasks created by `actor`.
    ///
    /// `period` is one of `today`, `yesterday`, `week`, `month`, `year` or
    /// `all-time`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] for an unknown period and
    /// [`TaskLifecycleError::Store`] when persistence fails.
    #[instrument(skip_all, fields(actor = %actor, period = period))]
    pub async fn task_stats(&self, actor: &ActorId, period: &str) -> TaskLifecycleResult<TaskStats> {
        let window = period.parse::<StatsPeriod>()?.window(self.clock.utc());
        let creator = actor.clone();

        self.store
            .transaction(move |tx| -> TaskLifecycleResult<TaskStats> {
                let current = |status| CreatedTaskFilter {
                    status: Some(status),
                    ..CreatedTaskFilter::default()
                };
                let created = CreatedTaskFilter {
                    status: None,
                    created_from: window.from,
                    created_before: window.before,
                };
                Ok(TaskStats {
                    pending: tx.count_created_by(&creator, &current(TaskStatus::Submitted))?,
                    in_progress: tx.count_created_by(&creator, &current(TaskStatus::Working))?,
                    new_tasks: tx.count_created_by(&creator, &created)?,
                    failed_tasks: tx.count_created_by(
                        &creator,
                        &CreatedTaskFilter {
                            status: Some(TaskStatus::Failed),
                            ..created
                        },
                    )?,
                })
            })
            .await
    }

    /// Publishes post-commit effects of a resolving operation.
    async fn publish(&self, resolution: &Resolution) {
        if let Some(parent) = &resolution.reopened {
            self.announce(parent).await;
        }
        let affected: BTreeSet<ActorId> = std::iter::once(&resolution.task)
            .chain(&resolution.canceled)
            .map(|task| task.assignee().clone())
            .collect();
        self.retire_idle(affected).await;
    }

    /// Indexes and notifies the assignee of a task that entered `submitted`.
    async fn announce(&self, task: &Task) {
        self.index.add(task.assignee());
        let notification = TaskNotification {
            task_id: task.id(),
            assignee: task.assignee().clone(),
            timestamp: self.clock.utc(),
        };
        if let Err(err) = self.notifier.notify(&notification).await {
            tracing::warn!(
                task_id = %notification.task_id,
                assignee = %notification.assignee,
                error = %err,
                "task notification failed"
            );
        }
    }

    /// Removes from the index every actor in `actors` left with no active
    /// task.
    async fn retire_idle(&self, actors: BTreeSet<ActorId>) {
        let counted = self
            .store
            .transaction(move |tx| {
                actors
                    .into_iter()
                    .map(|actor| {
                        tx.count_assigned(&actor, &TaskStatus::ACTIVE)
                            .map(|active| (actor, active))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .await;
        match counted {
            Ok(counts) => {
                for (actor, active) in counts {
                    if active == 0 {
                        self.index.remove(&actor);
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "activity check failed"),
        }
    }
}

fn forbidden(task: &Task, actor: &ActorId, action: TaskAction) -> TaskLifecycleError {
    TaskLifecycleError::Forbidden {
        task_id: task.id(),
        actor: actor.clone(),
        action,
    }
}

fn ensure_assignee(task: &Task, actor: &ActorId, action: TaskAction) -> TaskLifecycleResult<()> {
    if task.is_assignee(actor) {
        Ok(())
    } else {
        Err(forbidden(task, actor, action))
    }
}
