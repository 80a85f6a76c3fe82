//! Task aggregate root and related projection types.

use super::{ActorId, Credentials, TaskDomainError, TaskId, TaskStatus};
use chrono::{DateTime, Months, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Prefix stored in front of the reason of a failed task.
pub const FAILURE_REASON_PREFIX: &str = "FAILURE REASON: ";

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    created_at: DateTime<Utc>,
    delete_at: Option<DateTime<Utc>>,
    created_by: ActorId,
    assignee: ActorId,
    description: String,
    result: String,
    root_task_id: TaskId,
    parent_task_id: Option<TaskId>,
    credentials: Credentials,
    status: TaskStatus,
}

/// Caller-supplied fields for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Actor creating the task.
    pub created_by: ActorId,
    /// Actor responsible for performing the task.
    pub assignee: ActorId,
    /// Free-form description of the work.
    pub description: String,
    /// Explicit expiry; the retention default applies when `None`.
    pub delete_at: Option<DateTime<Utc>>,
    /// Validated credentials.
    pub credentials: Credentials,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted expiry timestamp.
    pub delete_at: Option<DateTime<Utc>>,
    /// Persisted creator.
    pub created_by: ActorId,
    /// Persisted assignee.
    pub assignee: ActorId,
    /// Persisted description.
    pub description: String,
    /// Persisted result text.
    pub result: String,
    /// Persisted root task identifier.
    pub root_task_id: TaskId,
    /// Persisted parent task identifier.
    pub parent_task_id: Option<TaskId>,
    /// Persisted credentials.
    pub credentials: Credentials,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
}

/// Condensed view of a root task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Identifier of the root task.
    pub root_task_id: TaskId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub delete_at: Option<DateTime<Utc>>,
    /// Assignee of the root task.
    pub assignee: ActorId,
    /// Description of the root task.
    pub description: String,
    /// Current status of the root task.
    pub status: TaskStatus,
}

impl Task {
    /// Creates a root task in `submitted`.
    ///
    /// The task is its own root. When the draft carries no expiry, the task
    /// expires `retention` after creation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyDescription`] when the description is
    /// blank.
    pub fn new_root(
        draft: TaskDraft,
        retention: Months,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let id = TaskId::new();
        Self::from_draft(id, id, None, draft, retention, clock)
    }

    /// Creates a subtask of `parent` in `submitted`.
    ///
    /// The subtask inherits the parent's root. The parent itself is not
    /// modified; callers move it to `waiting` in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ParentNotActive`] when the parent is not
    /// submitted, working or waiting, and
    /// [`TaskDomainError::EmptyDescription`] when the description is blank.
    pub fn new_child(
        draft: TaskDraft,
        parent: &Self,
        retention: Months,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        if !parent.status.is_active() {
            return Err(TaskDomainError::ParentNotActive {
                parent_id: parent.id,
                status: parent.status,
            });
        }
        Self::from_draft(
            TaskId::new(),
            parent.root_task_id,
            Some(parent.id),
            draft,
            retention,
            clock,
        )
    }

    fn from_draft(
        id: TaskId,
        root_task_id: TaskId,
        parent_task_id: Option<TaskId>,
        draft: TaskDraft,
        retention: Months,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let TaskDraft {
            created_by,
            assignee,
            description,
            delete_at,
            credentials,
        } = draft;
        if description.trim().is_empty() {
            return Err(TaskDomainError::EmptyDescription);
        }

        let created_at = clock.utc();
        let expiry = delete_at.or_else(|| created_at.checked_add_months(retention));

        Ok(Self {
            id,
            created_at,
            delete_at: expiry,
            created_by,
            assignee,
            description,
            result: String::new(),
            root_task_id,
            parent_task_id,
            credentials,
            status: TaskStatus::Submitted,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            created_at: data.created_at,
            delete_at: data.delete_at,
            created_by: data.created_by,
            assignee: data.assignee,
            description: data.description,
            result: data.result,
            root_task_id: data.root_task_id,
            parent_task_id: data.parent_task_id,
            credentials: data.credentials,
            status: data.status,
        }
    }

    /// Decomposes the task into its persisted fields.
    #[must_use]
    pub fn into_persisted(self) -> PersistedTaskData {
        PersistedTaskData {
            id: self.id,
            created_at: self.created_at,
            delete_at: self.delete_at,
            created_by: self.created_by,
            assignee: self.assignee,
            description: self.description,
            result: self.result,
            root_task_id: self.root_task_id,
            parent_task_id: self.parent_task_id,
            credentials: self.credentials,
            status: self.status,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the expiry timestamp, if any.
    #[must_use]
    pub const fn delete_at(&self) -> Option<DateTime<Utc>> {
        self.delete_at
    }

    /// Returns the creator.
    #[must_use]
    pub const fn created_by(&self) -> &ActorId {
        &self.created_by
    }

    /// Returns the assignee.
    #[must_use]
    pub const fn assignee(&self) -> &ActorId {
        &self.assignee
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the result text.
    #[must_use]
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Returns the root task identifier.
    #[must_use]
    pub const fn root_task_id(&self) -> TaskId {
        self.root_task_id
    }

    /// Returns the parent task identifier, if any.
    #[must_use]
    pub const fn parent_task_id(&self) -> Option<TaskId> {
        self.parent_task_id
    }

    /// Returns the credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns `true` when the task has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_task_id.is_none()
    }

    /// Returns `true` when `actor` is the assignee.
    #[must_use]
    pub fn is_assignee(&self, actor: &ActorId) -> bool {
        &self.assignee == actor
    }

    /// Returns `true` when `actor` created the task.
    #[must_use]
    pub fn is_creator(&self, actor: &ActorId) -> bool {
        &self.created_by == actor
    }

    /// Moves the task to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the edge is
    /// not part of the state machine. The task is left unchanged.
    pub fn transition_to(&mut self, target: TaskStatus) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    /// Marks a working task as completed with the given result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyResult`] for a blank result and
    /// [`TaskDomainError::InvalidStateTransition`] unless the task is working.
    pub fn complete(
        &mut self,
        result: String,
        delete_at: Option<DateTime<Utc>>,
    ) -> Result<(), TaskDomainError> {
        if result.trim().is_empty() {
            return Err(TaskDomainError::EmptyResult);
        }
        self.transition_to(TaskStatus::Completed)?;
        self.result = result;
        if delete_at.is_some() {
            self.delete_at = delete_at;
        }
        Ok(())
    }

    /// Marks a working task as failed, recording the reason.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyFailureReason`] for a blank reason and
    /// [`TaskDomainError::InvalidStateTransition`] unless the task is working.
    pub fn fail(&mut self, reason: &str) -> Result<(), TaskDomainError> {
        if reason.trim().is_empty() {
            return Err(TaskDomainError::EmptyFailureReason);
        }
        self.transition_to(TaskStatus::Failed)?;
        self.result = format!("{FAILURE_REASON_PREFIX}{reason}");
        Ok(())
    }

    /// Cancels the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the task is
    /// already completed, failed or canceled.
    pub fn cancel(&mut self) -> Result<(), TaskDomainError> {
        if self.status.is_terminal() {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.status,
                to: TaskStatus::Canceled,
            });
        }
        self.status = TaskStatus::Canceled;
        Ok(())
    }

    /// Returns a copy with credentials removed, for listings shared with the
    /// tree owner.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.credentials = Credentials::empty();
        self
    }

    /// Returns the root-task summary projection.
    #[must_use]
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            root_task_id: self.id,
            created_at: self.created_at,
            delete_at: self.delete_at,
            assignee: self.assignee.clone(),
            description: self.description.clone(),
            status: self.status,
        }
    }
}
