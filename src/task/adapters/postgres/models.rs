//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub delete_at: Option<DateTime<Utc>>,
    /// Creator.
    pub created_by: String,
    /// Assignee.
    pub assignee: String,
    /// Description.
    pub description: String,
    /// Result text.
    pub result: String,
    /// Root task identifier.
    pub root_task_id: uuid::Uuid,
    /// Parent task identifier.
    pub parent_task_id: Option<uuid::Uuid>,
    /// Credentials JSON payload.
    pub credentials: Value,
    /// Lifecycle status.
    pub status: String,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub delete_at: Option<DateTime<Utc>>,
    /// Creator.
    pub created_by: String,
    /// Assignee.
    pub assignee: String,
    /// Description.
    pub description: String,
    /// Result text.
    pub result: String,
    /// Root task identifier.
    pub root_task_id: uuid::Uuid,
    /// Parent task identifier.
    pub parent_task_id: Option<uuid::Uuid>,
    /// Credentials JSON payload.
    pub credentials: Value,
    /// Lifecycle status.
    pub status: String,
}

/// Changeset for the fields a task may change after creation.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeset {
    /// Expiry timestamp.
    pub delete_at: Option<DateTime<Utc>>,
    /// Result text.
    pub result: String,
    /// Lifecycle status.
    pub status: String,
}
