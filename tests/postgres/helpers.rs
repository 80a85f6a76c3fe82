//! Shared helpers for `PostgreSQL` integration tests.
//!
//! Tests run against the server named by `AGENT_TASKS_TEST_DATABASE_URL` and
//! are ignored by default; run them with `cargo test -- --ignored`. Each test
//! works in its own schema, which is dropped when the returned [`PgContext`]
//! goes out of scope.

use agent_task_manager::task::{
    adapters::{
        memory::RecordingNotifier,
        postgres::{PostgresTaskStore, TASKS_SCHEMA_SQL, TaskPgPool},
    },
    domain::{ActorId, TaskId, TaskStatus},
    ports::TaskStore,
    services::{ActivityIndex, TaskLifecycleService},
};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Environment variable naming the test server.
pub const TEST_DATABASE_URL: &str = "AGENT_TASKS_TEST_DATABASE_URL";

/// Boxed error type for test setup failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service type wired to the `PostgreSQL` store.
pub type PgService = TaskLifecycleService<PostgresTaskStore, RecordingNotifier, DefaultClock>;

#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SearchPath {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!("SET search_path TO {}", self.0))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Isolated schema with a store and service bound to it.
pub struct PgContext {
    url: String,
    schema: String,
    pub store: Arc<PostgresTaskStore>,
    pub service: PgService,
}

impl PgContext {
    /// Creates a fresh schema holding the `tasks` table.
    ///
    /// # Errors
    ///
    /// Returns an error when no test server is configured, the server is
    /// unreachable or the schema cannot be created.
    pub fn connect() -> Result<Self, BoxError> {
        let url = std::env::var(TEST_DATABASE_URL)
            .map_err(|err| format!("{TEST_DATABASE_URL} must name a test server: {err}"))?;
        let schema = format!("agent_tasks_{}", Uuid::new_v4().simple());

        let mut admin = PgConnection::establish(&url)?;
        admin.batch_execute(&format!(
            "CREATE SCHEMA {schema}; SET search_path TO {schema};"
        ))?;
        admin.batch_execute(TASKS_SCHEMA_SQL)?;

        let pool: TaskPgPool = Pool::builder()
            .max_size(8)
            .connection_customizer(Box::new(SearchPath(schema.clone())))
            .build(ConnectionManager::<PgConnection>::new(url.as_str()))?;
        let store = Arc::new(
            PostgresTaskStore::new(pool).with_transaction_timeout(Duration::from_secs(10)),
        );
        let service = TaskLifecycleService::new(
            Arc::clone(&store),
            Arc::new(RecordingNotifier::new()),
            Arc::new(ActivityIndex::new()),
            Arc::new(DefaultClock),
        );

        Ok(Self {
            url,
            schema,
            store,
            service,
        })
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

impl Drop for PgContext {
    fn drop(&mut self) {
        if let Ok(mut conn) = PgConnection::establish(&self.url) {
            let cleanup = format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema);
            if let Err(err) = conn.batch_execute(&cleanup) {
                tracing::warn!(schema = %self.schema, error = %err, "test schema not dropped");
            }
        }
    }
}

/// Fixture providing an isolated schema on the test server.
#[fixture]
pub fn pg_context() -> Result<PgContext, BoxError> {
    PgContext::connect()
}

/// Parses an actor identifier.
///
/// # Errors
///
/// Returns an error for a blank identifier.
pub fn actor(name: &str) -> Result<ActorId, eyre::Report> {
    Ok(ActorId::new(name)?)
}
