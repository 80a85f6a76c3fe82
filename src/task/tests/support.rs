//! Shared fixtures for task unit tests.

use crate::task::{
    adapters::memory::{InMemoryTaskStore, RecordingNotifier},
    domain::{ActorId, Credentials, PersistedTaskData, Task, TaskId, TaskStatus},
    ports::TaskStore,
    services::{ActivityIndex, TaskLifecycleService},
};
use chrono::{DateTime, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;

pub(super) type TestService =
    TaskLifecycleService<InMemoryTaskStore, RecordingNotifier, DefaultClock>;

/// Service wired to in-memory adapters, with handles on each collaborator.
pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) store: Arc<InMemoryTaskStore>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) index: Arc<ActivityIndex>,
}

#[fixture]
pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryTaskStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let index = Arc::new(ActivityIndex::new());
    let service = TaskLifecycleService::new(
        Arc::clone(&store),
        Arc::clone(&notifier),
        Arc::clone(&index),
        Arc::new(DefaultClock),
    );
    Harness {
        service,
        store,
        notifier,
        index,
    }
}

pub(super) fn actor(name: &str) -> ActorId {
    ActorId::new(name).expect("valid actor identifier")
}

pub(super) async fn stored(store: &InMemoryTaskStore, id: TaskId) -> Task {
    store
        .transaction(move |tx| tx.find(id))
        .await
        .expect("store read should succeed")
        .expect("task should exist")
}

pub(super) async fn status_of(store: &InMemoryTaskStore, id: TaskId) -> TaskStatus {
    stored(store, id).await.status()
}

/// Sets a status directly, as an external process would.
pub(super) async fn force_status(store: &InMemoryTaskStore, id: TaskId, status: TaskStatus) {
    store
        .transaction(move |tx| tx.set_status(&[id], status))
        .await
        .expect("status update should succeed");
}

/// Inserts a root task with explicit timestamps.
pub(super) async fn insert_root(
    store: &InMemoryTaskStore,
    creator: &ActorId,
    created_at: DateTime<Utc>,
    delete_at: Option<DateTime<Utc>>,
    status: TaskStatus,
) -> TaskId {
    let id = TaskId::new();
    let task = Task::from_persisted(PersistedTaskData {
        id,
        created_at,
        delete_at,
        created_by: creator.clone(),
        assignee: creator.clone(),
        description: "seeded".to_owned(),
        result: String::new(),
        root_task_id: id,
        parent_task_id: None,
        credentials: Credentials::empty(),
        status,
    });
    store
        .transaction(move |tx| tx.insert(&task))
        .await
        .expect("insert should succeed");
    id
}
