//! `PostgreSQL` store implementation for task persistence.

use super::{
    models::{NewTaskRow, TaskChangeset, TaskRow},
    schema::tasks,
};
use crate::task::{
    domain::{ActorId, Credentials, PersistedTaskData, Task, TaskId, TaskStatus},
    ports::{CreatedTaskFilter, TaskStore, TaskStoreError, TaskStoreResult, TaskTransaction},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::time::Duration;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// DDL creating the `tasks` table and its indexes.
pub const TASKS_SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-01-000000_create_tasks/up.sql");

const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// `PostgreSQL`-backed task store.
///
/// Transactions run at `READ COMMITTED` on a blocking thread. Rows whose
/// status is read and then written are fetched with `SELECT ... FOR UPDATE`,
/// and every transaction sets `statement_timeout` and `lock_timeout`.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
    transaction_timeout: Duration,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self {
            pool,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Sets the statement and lock timeout applied to each transaction.
    #[must_use]
    pub const fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }
}

/// Abort reason carried through Diesel's transaction boundary.
enum TxAbort<E> {
    Store(TaskStoreError),
    Operation(E),
}

impl<E> From<DieselError> for TxAbort<E> {
    fn from(err: DieselError) -> Self {
        Self::Store(map_diesel_error(err))
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn transaction<T, E, F>(&self, op: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static,
        F: FnOnce(&mut dyn TaskTransaction) -> Result<T, E> + Send + 'static,
    {
        let pool = self.pool.clone();
        let timeout_ms = u64::try_from(self.transaction_timeout.as_millis()).unwrap_or(u64::MAX);

        tokio::task::spawn_blocking(move || -> Result<T, E> {
            let mut pooled = pool.get().map_err(TaskStoreError::persistence)?;
            let connection: &mut PgConnection = &mut pooled;
            connection
                .transaction::<T, TxAbort<E>, _>(|tx_conn| {
                    set_timeouts(tx_conn, timeout_ms).map_err(TxAbort::Store)?;
                    let mut tx = PgTransaction { conn: tx_conn };
                    op(&mut tx).map_err(TxAbort::Operation)
                })
                .map_err(|abort| match abort {
                    TxAbort::Store(err) => E::from(err),
                    TxAbort::Operation(err) => err,
                })
        })
        .await
        .map_err(|err| E::from(TaskStoreError::persistence(err)))?
    }
}

/// `PostgreSQL` `SET` does not accept bind parameters; the values are
/// integers so interpolation is safe.
fn set_timeouts(conn: &mut PgConnection, timeout_ms: u64) -> TaskStoreResult<()> {
    diesel::sql_query(format!("SET LOCAL statement_timeout = {timeout_ms}"))
        .execute(conn)
        .map_err(map_diesel_error)?;
    diesel::sql_query(format!("SET LOCAL lock_timeout = {timeout_ms}"))
        .execute(conn)
        .map_err(map_diesel_error)?;
    Ok(())
}

fn map_diesel_error(err: DieselError) -> TaskStoreError {
    if let DieselError::DatabaseError(kind, info) = &err {
        let message = info.message();
        if matches!(kind, DatabaseErrorKind::SerializationFailure)
            || message.contains("deadlock detected")
        {
            return TaskStoreError::Conflict;
        }
        if message.contains("statement timeout") || message.contains("lock timeout") {
            return TaskStoreError::Timeout;
        }
    }
    TaskStoreError::persistence(err)
}

struct PgTransaction<'a> {
    conn: &'a mut PgConnection,
}

fn status_names(statuses: &[TaskStatus]) -> Vec<&'static str> {
    statuses.iter().map(|status| status.as_str()).collect()
}

fn to_count(value: i64) -> TaskStoreResult<u64> {
    u64::try_from(value).map_err(TaskStoreError::persistence)
}

fn to_affected(value: usize) -> TaskStoreResult<u64> {
    u64::try_from(value).map_err(TaskStoreError::persistence)
}

fn rows_to_tasks(rows: Vec<TaskRow>) -> TaskStoreResult<Vec<Task>> {
    rows.into_iter().map(row_to_task).collect()
}

impl TaskTransaction for PgTransaction<'_> {
    fn insert(&mut self, task: &Task) -> TaskStoreResult<()> {
        let task_id = task.id();
        diesel::insert_into(tasks::table)
            .values(&to_new_row(task))
            .execute(self.conn)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    TaskStoreError::DuplicateTask(task_id)
                }
                other => map_diesel_error(other),
            })?;
        Ok(())
    }

    fn save(&mut self, task: &Task) -> TaskStoreResult<()> {
        let changeset = TaskChangeset {
            delete_at: task.delete_at(),
            result: task.result().to_owned(),
            status: task.status().as_str().to_owned(),
        };
        let updated = diesel::update(tasks::table.find(task.id().into_inner()))
            .set(&changeset)
            .execute(self.conn)
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(TaskStoreError::NotFound(task.id()));
        }
        Ok(())
    }

    fn find(&mut self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        tasks::table
            .find(id.into_inner())
            .select(TaskRow::as_select())
            .first::<TaskRow>(self.conn)
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_task)
            .transpose()
    }

    fn lock(&mut self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        tasks::table
            .find(id.into_inner())
            .select(TaskRow::as_select())
            .for_update()
            .first::<TaskRow>(self.conn)
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_task)
            .transpose()
    }

    fn next_claim_candidate(
        &mut self,
        assignee: &ActorId,
        skip: &[TaskId],
    ) -> TaskStoreResult<Option<TaskId>> {
        let skipped: Vec<uuid::Uuid> = skip.iter().map(|id| id.into_inner()).collect();
        let candidate = tasks::table
            .filter(tasks::status.eq(TaskStatus::Submitted.as_str()))
            .filter(tasks::assignee.eq(assignee.as_str()))
            .filter(tasks::id.ne_all(skipped))
            .order((tasks::created_at.asc(), tasks::seq.asc()))
            .select(tasks::id)
            .first::<uuid::Uuid>(self.conn)
            .optional()
            .map_err(map_diesel_error)?;
        Ok(candidate.map(TaskId::from_uuid))
    }

    fn lock_children(
        &mut self,
        parent: TaskId,
        statuses: &[TaskStatus],
    ) -> TaskStoreResult<Vec<Task>> {
        let rows = tasks::table
            .filter(tasks::parent_task_id.eq(parent.into_inner()))
            .filter(tasks::status.eq_any(status_names(statuses)))
            .order((tasks::created_at.asc(), tasks::seq.asc()))
            .select(TaskRow::as_select())
            .for_update()
            .load::<TaskRow>(self.conn)
            .map_err(map_diesel_error)?;
        rows_to_tasks(rows)
    }

    fn set_status(&mut self, ids: &[TaskId], status: TaskStatus) -> TaskStoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let targets: Vec<uuid::Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let updated = diesel::update(tasks::table.filter(tasks::id.eq_any(targets)))
            .set(tasks::status.eq(status.as_str()))
            .execute(self.conn)
            .map_err(map_diesel_error)?;
        to_affected(updated)
    }

    fn count_children(
        &mut self,
        parent: TaskId,
        statuses: Option<&[TaskStatus]>,
    ) -> TaskStoreResult<u64> {
        let mut query = tasks::table
            .filter(tasks::parent_task_id.eq(parent.into_inner()))
            .into_boxed();
        if let Some(wanted) = statuses {
            query = query.filter(tasks::status.eq_any(status_names(wanted)));
        }
        let total = query
            .count()
            .get_result::<i64>(self.conn)
            .map_err(map_diesel_error)?;
        to_count(total)
    }

    fn count_assigned(
        &mut self,
        assignee: &ActorId,
        statuses: &[TaskStatus],
    ) -> TaskStoreResult<u64> {
        let total = tasks::table
            .filter(tasks::assignee.eq(assignee.as_str()))
            .filter(tasks::status.eq_any(status_names(statuses)))
            .count()
            .get_result::<i64>(self.conn)
            .map_err(map_diesel_error)?;
        to_count(total)
    }

    fn find_by_root(&mut self, root: TaskId) -> TaskStoreResult<Vec<Task>> {
        let rows = tasks::table
            .filter(tasks::root_task_id.eq(root.into_inner()))
            .order((tasks::created_at.asc(), tasks::seq.asc()))
            .select(TaskRow::as_select())
            .load::<TaskRow>(self.conn)
            .map_err(map_diesel_error)?;
        rows_to_tasks(rows)
    }

    fn find_roots_created_by(&mut self, actor: &ActorId) -> TaskStoreResult<Vec<Task>> {
        let rows = tasks::table
            .filter(tasks::created_by.eq(actor.as_str()))
            .filter(tasks::parent_task_id.is_null())
            .order((tasks::created_at.asc(), tasks::seq.asc()))
            .select(TaskRow::as_select())
            .load::<TaskRow>(self.conn)
            .map_err(map_diesel_error)?;
        rows_to_tasks(rows)
    }

    fn distinct_assignees(&mut self, statuses: &[TaskStatus]) -> TaskStoreResult<Vec<ActorId>> {
        let names = tasks::table
            .filter(tasks::status.eq_any(status_names(statuses)))
            .select(tasks::assignee)
            .distinct()
            .order(tasks::assignee.asc())
            .load::<String>(self.conn)
            .map_err(map_diesel_error)?;
        names
            .into_iter()
            .map(|name| ActorId::new(name).map_err(TaskStoreError::persistence))
            .collect()
    }

    fn count_created_by(
        &mut self,
        actor: &ActorId,
        filter: &CreatedTaskFilter,
    ) -> TaskStoreResult<u64> {
        let mut query = tasks::table
            .filter(tasks::created_by.eq(actor.as_str()))
            .into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(tasks::status.eq(status.as_str()));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(tasks::created_at.ge(from));
        }
        if let Some(before) = filter.created_before {
            query = query.filter(tasks::created_at.lt(before));
        }
        let total = query
            .count()
            .get_result::<i64>(self.conn)
            .map_err(map_diesel_error)?;
        to_count(total)
    }

    fn count_expired(&mut self, now: DateTime<Utc>) -> TaskStoreResult<u64> {
        let total = tasks::table
            .filter(tasks::delete_at.is_not_null())
            .filter(tasks::delete_at.lt(now))
            .count()
            .get_result::<i64>(self.conn)
            .map_err(map_diesel_error)?;
        to_count(total)
    }

    fn delete_expired(&mut self, now: DateTime<Utc>) -> TaskStoreResult<u64> {
        let removed = diesel::delete(
            tasks::table
                .filter(tasks::delete_at.is_not_null())
                .filter(tasks::delete_at.lt(now)),
        )
        .execute(self.conn)
        .map_err(map_diesel_error)?;
        to_affected(removed)
    }
}

fn to_new_row(task: &Task) -> NewTaskRow {
    NewTaskRow {
        id: task.id().into_inner(),
        created_at: task.created_at(),
        delete_at: task.delete_at(),
        created_by: task.created_by().as_str().to_owned(),
        assignee: task.assignee().as_str().to_owned(),
        description: task.description().to_owned(),
        result: task.result().to_owned(),
        root_task_id: task.root_task_id().into_inner(),
        parent_task_id: task.parent_task_id().map(TaskId::into_inner),
        credentials: task.credentials().to_json(),
        status: task.status().as_str().to_owned(),
    }
}

fn row_to_task(row: TaskRow) -> TaskStoreResult<Task> {
    let TaskRow {
        id,
        created_at,
        delete_at,
        created_by,
        assignee,
        description,
        result,
        root_task_id,
        parent_task_id,
        credentials,
        status,
    } = row;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        created_at,
        delete_at,
        created_by: ActorId::new(created_by).map_err(TaskStoreError::persistence)?,
        assignee: ActorId::new(assignee).map_err(TaskStoreError::persistence)?,
        description,
        result,
        root_task_id: TaskId::from_uuid(root_task_id),
        parent_task_id: parent_task_id.map(TaskId::from_uuid),
        credentials: Credentials::from_json(credentials).map_err(TaskStoreError::persistence)?,
        status: TaskStatus::try_from(status.as_str()).map_err(TaskStoreError::persistence)?,
    };
    Ok(Task::from_persisted(data))
}
