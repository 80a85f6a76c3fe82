//! Shared fixtures for in-memory integration tests.

use agent_task_manager::task::{
    adapters::memory::{InMemoryTaskStore, RecordingNotifier},
    domain::{ActorId, Task, TaskId, TaskStatus},
    ports::TaskStore,
    services::{ActivityIndex, CreateTaskRequest, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;

/// Service type wired to in-memory adapters.
pub type TestService = TaskLifecycleService<InMemoryTaskStore, RecordingNotifier, DefaultClock>;

/// Service plus handles on its in-memory collaborators.
pub struct Engine {
    pub service: TestService,
    pub store: Arc<InMemoryTaskStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Engine {
    /// Creates a task as `creator`, optionally under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error when creation fails.
    pub async fn create(
        &self,
        creator: &str,
        assignee: &str,
        parent: Option<TaskId>,
    ) -> Result<Task, eyre::Report> {
        let base = CreateTaskRequest::new(format!("work for {assignee}"), assignee);
        let request = match parent {
            Some(parent_id) => base.with_parent(parent_id),
            None => base,
        };
        Ok(self.service.create_task(&actor(creator)?, request).await?)
    }

    /// Reads the stored status of `id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the task is missing or the read fails.
    pub async fn status(&self, id: TaskId) -> Result<TaskStatus, eyre::Report> {
        self.store
            .transaction(move |tx| tx.find(id))
            .await?
            .map(|task| task.status())
            .ok_or_else(|| eyre::eyre!("task {id} missing"))
    }
}

/// Provides a fresh engine for each test.
#[fixture]
pub fn engine() -> Engine {
    let store = Arc::new(InMemoryTaskStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let service = TaskLifecycleService::new(
        Arc::clone(&store),
        Arc::clone(&notifier),
        Arc::new(ActivityIndex::new()),
        Arc::new(DefaultClock),
    );
    Engine {
        service,
        store,
        notifier,
    }
}

/// Parses an actor identifier.
///
/// # Errors
///
/// Returns an error for a blank identifier.
pub fn actor(name: &str) -> Result<ActorId, eyre::Report> {
    Ok(ActorId::new(name)?)
}
