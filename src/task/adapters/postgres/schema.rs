//! Diesel schema for task persistence.

diesel::table! {
    /// Hierarchical task records.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Expiry timestamp driving the retention sweep.
        delete_at -> Nullable<Timestamptz>,
        /// Actor that created the task.
        #[max_length = 255]
        created_by -> Varchar,
        /// Actor expected to perform the task.
        #[max_length = 255]
        assignee -> Varchar,
        /// Task description.
        description -> Text,
        /// Completion result or failure reason.
        result -> Text,
        /// Root of the task tree.
        root_task_id -> Uuid,
        /// Direct parent, absent for roots.
        parent_task_id -> Nullable<Uuid>,
        /// Per-service credentials.
        credentials -> Jsonb,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Insertion order, breaking `created_at` ties.
        seq -> Int8,
    }
}
