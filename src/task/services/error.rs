//! Service-level error taxonomy for task lifecycle operations.

use crate::task::{
    domain::{ActorId, TaskDomainError, TaskId},
    ports::TaskStoreError,
};
use std::fmt;
use thiserror::Error;

/// Operation an actor attempted on a task it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Completing a task.
    Complete,
    /// Failing a task.
    Fail,
    /// Canceling a task.
    Cancel,
    /// Listing a task tree.
    ListTree,
}

impl TaskAction {
    /// Returns a lowercase label for messages and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Cancel => "cancel",
            Self::ListTree => "list",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a [`TaskLifecycleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request violates a domain rule.
    Validation,
    /// The actor may not perform the operation.
    Forbidden,
    /// The target does not exist, or there is nothing to claim.
    NotFound,
    /// The store failed; the operation may be retried.
    Infrastructure,
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// The actor is neither the assignee nor, where permitted, the creator.
    #[error("actor {actor} may not {action} task {task_id}")]
    Forbidden {
        /// Target task.
        task_id: TaskId,
        /// Actor that made the request.
        actor: ActorId,
        /// Attempted operation.
        action: TaskAction,
    },

    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// No submitted task is assigned to the actor.
    #[error("no task available to claim for {0}")]
    NothingToClaim(ActorId),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl TaskLifecycleError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(_) => ErrorKind::Validation,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound(_) | Self::NothingToClaim(_) => ErrorKind::NotFound,
            Self::Store(TaskStoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns `true` when retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Infrastructure)
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;
