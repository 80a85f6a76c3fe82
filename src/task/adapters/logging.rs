//! Notifier that only emits structured log events.

use async_trait::async_trait;

use crate::task::ports::{NotifyError, TaskNotification, TaskNotifier};

/// Notifier for deployments without an external queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl TaskNotifier for LogNotifier {
    async fn notify(&self, notification: &TaskNotification) -> Result<(), NotifyError> {
        tracing::info!(
            task_id = %notification.task_id,
            assignee = %notification.assignee,
            timestamp = %notification.timestamp,
            "task ready to claim"
        );
        Ok(())
    }
}
