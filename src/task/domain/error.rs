//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// An actor identifier is empty after trimming.
    #[error("actor identifier must not be empty")]
    EmptyActor,

    /// An actor identifier is longer than the stored column allows.
    #[error("actor identifier must be at most {max} characters, got {len}")]
    ActorTooLong {
        /// Maximum length in characters.
        max: usize,
        /// Length of the rejected value.
        len: usize,
    },

    /// The task description is empty after trimming.
    #[error("task description must not be empty")]
    EmptyDescription,

    /// The completion result is empty after trimming.
    #[error("task result must not be empty")]
    EmptyResult,

    /// The failure reason is empty after trimming.
    #[error("failure reason must not be empty")]
    EmptyFailureReason,

    /// The credentials payload does not have the expected shape.
    #[error("invalid credentials format: {0}")]
    InvalidCredentials(String),

    /// The referenced parent task does not exist.
    #[error("parent task not found: {0}")]
    ParentNotFound(TaskId),

    /// The parent task cannot accept new subtasks in its current status.
    #[error("parent task {parent_id} must be submitted, working or waiting, found {status}")]
    ParentNotActive {
        /// Parent task identifier.
        parent_id: TaskId,
        /// Current parent status.
        status: TaskStatus,
    },

    /// The requested status transition is not permitted.
    #[error("invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Current task status.
        from: TaskStatus,
        /// Requested target status.
        to: TaskStatus,
    },

    /// The statistics period is not recognised.
    #[error(
        "invalid period '{0}', expected one of: today, yesterday, week, month, year, all-time"
    )]
    InvalidStatsPeriod(String),
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
