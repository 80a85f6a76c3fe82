//! Task status values and the transition table between them.

use super::ParseTaskStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Task is waiting to be claimed by its assignee.
    Submitted,
    /// Task has been claimed and is being performed.
    Working,
    /// Task is blocked on at least one subtask.
    Waiting,
    /// Task finished successfully.
    Completed,
    /// Task finished unsuccessfully.
    Failed,
    /// Task was canceled by an actor or by a cascade.
    Canceled,
    /// Task was rejected outside the engine.
    Rejected,
    /// Task needs input; set outside the engine.
    InputRequired,
}

impl TaskStatus {
    /// Statuses that count as outstanding work for cascades, rollups and the
    /// activity index.
    pub const ACTIVE: [Self; 3] = [Self::Submitted, Self::Working, Self::Waiting];

    /// Statuses that satisfy a parent rollup.
    pub const RESOLVED: [Self; 2] = [Self::Completed, Self::Canceled];

    /// Every status, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Submitted,
        Self::Working,
        Self::Waiting,
        Self::Completed,
        Self::Failed,
        Self::Canceled,
        Self::Rejected,
        Self::InputRequired,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::InputRequired => "input-required",
        }
    }

    /// Returns `true` for `submitted`, `working` and `waiting`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Submitted | Self::Working | Self::Waiting)
    }

    /// Returns `true` for statuses no operator can leave.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Returns `true` when the engine may move a task from `self` to `target`.
    ///
    /// `waiting → waiting` is permitted so that adding a further subtask to a
    /// parent that is already waiting is not an error.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Submitted => matches!(target, Self::Working | Self::Waiting | Self::Canceled),
            Self::Working => matches!(
                target,
                Self::Waiting | Self::Completed | Self::Failed | Self::Canceled
            ),
            Self::Waiting => matches!(target, Self::Waiting | Self::Submitted | Self::Canceled),
            Self::Rejected | Self::InputRequired => matches!(target, Self::Canceled),
            Self::Completed | Self::Failed | Self::Canceled => false,
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "submitted" => Ok(Self::Submitted),
            "working" => Ok(Self::Working),
            "waiting" => Ok(Self::Waiting),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            "rejected" => Ok(Self::Rejected),
            "input-required" => Ok(Self::InputRequired),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
