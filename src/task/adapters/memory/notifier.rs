//! Notifier that records deliveries for later inspection.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::task::ports::{NotifyError, TaskNotification, TaskNotifier};

/// Thread-safe notifier that keeps every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<TaskNotification>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notifications delivered so far, oldest first.
    #[must_use]
    pub fn delivered(&self) -> Vec<TaskNotification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TaskNotifier for RecordingNotifier {
    async fn notify(&self, notification: &TaskNotification) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}
