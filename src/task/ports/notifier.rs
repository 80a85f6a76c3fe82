//! Outbound notification port for tasks that became claimable.

use crate::task::domain::{ActorId, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Notice that a task entered `submitted` and can be claimed by its assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNotification {
    /// Task that became claimable.
    pub task_id: TaskId,
    /// Actor expected to claim it.
    pub assignee: ActorId,
    /// Time the notification was produced.
    pub timestamp: DateTime<Utc>,
}

/// Delivery contract for task notifications.
///
/// Delivery is best effort: services log failures and carry on.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    /// Delivers one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the transport rejects the notification.
    async fn notify(&self, notification: &TaskNotification) -> Result<(), NotifyError>;
}

/// Notification delivery failure.
#[derive(Debug, Clone, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub Arc<dyn std::error::Error + Send + Sync>);

impl NotifyError {
    /// Wraps a transport error.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}
