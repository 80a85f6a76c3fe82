//! Shared world state for task tree BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use agent_task_manager::task::{
    adapters::memory::{InMemoryTaskStore, RecordingNotifier},
    domain::{ActorId, Task, TaskId},
    ports::TaskStore,
    services::{ActivityIndex, TaskLifecycleError, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestTaskService = TaskLifecycleService<InMemoryTaskStore, RecordingNotifier, DefaultClock>;

/// Scenario world for task tree behaviour tests.
pub struct TaskTreeWorld {
    pub service: TestTaskService,
    pub store: Arc<InMemoryTaskStore>,
    pub tasks: HashMap<String, TaskId>,
    pub last_result: Option<Result<Task, TaskLifecycleError>>,
}

impl TaskTreeWorld {
    /// Creates a world with an empty store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let service = TaskLifecycleService::new(
            Arc::clone(&store),
            Arc::new(RecordingNotifier::new()),
            Arc::new(ActivityIndex::new()),
            Arc::new(DefaultClock),
        );

        Self {
            service,
            store,
            tasks: HashMap::new(),
            last_result: None,
        }
    }

    /// Resolves a scenario label to its task identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was created under `label`.
    pub fn task_id(&self, label: &str) -> Result<TaskId, eyre::Report> {
        self.tasks
            .get(label)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task labelled {label} in scenario world"))
    }

    /// Loads the current state of the task labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns an error when the label is unknown or the store read fails.
    pub fn load(&self, label: &str) -> Result<Task, eyre::Report> {
        let id = self.task_id(label)?;
        run_async(self.store.transaction(move |tx| tx.find(id)))?
            .ok_or_else(|| eyre::eyre!("task {label} missing from store"))
    }
}

impl Default for TaskTreeWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskTreeWorld {
    TaskTreeWorld::default()
}

/// Parses an actor identifier from scenario text.
///
/// # Errors
///
/// Returns an error for a blank identifier.
pub fn actor(name: &str) -> Result<ActorId, eyre::Report> {
    ActorId::new(name).map_err(|err| eyre::eyre!("invalid actor in scenario: {err}"))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
