//! Store-level persistence tests.

use super::helpers::{BoxError, PgContext, actor, pg_context};
use agent_task_manager::task::{
    domain::{ActorId, Credentials, PersistedTaskData, Task, TaskDraft, TaskId, TaskStatus},
    ports::{CreatedTaskFilter, TaskStore, TaskStoreError},
    services::CreateTaskRequest,
};
use chrono::{Duration, Months, Utc};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;

fn draft(assignee: &str) -> Result<TaskDraft, eyre::Report> {
    Ok(TaskDraft {
        created_by: actor("planner")?,
        assignee: actor(assignee)?,
        description: format!("work for {assignee}"),
        delete_at: None,
        credentials: Credentials::from_json(json!({"github": {"GITHUB_TOKEN": "ghp_1"}}))?,
    })
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL server named by AGENT_TASKS_TEST_DATABASE_URL"]
async fn inserted_task_reads_back_intact(
    pg_context: Result<PgContext, BoxError>,
) -> Result<(), eyre::Report> {
    let ctx = pg_context.map_err(|err| eyre::eyre!(err))?;
    let task = Task::new_root(draft("worker")?, Months::new(3), &DefaultClock)?;
    let inserted = task.clone();
    ctx.store.transaction(move |tx| tx.insert(&inserted)).await?;

    let id = task.id();
    let loaded = ctx
        .store
        .transaction(move |tx| tx.find(id))
        .await?
        .ok_or_else(|| eyre::eyre!("task missing"))?;

    eyre::ensure!(loaded.root_task_id() == id, "root reference");
    eyre::ensure!(loaded.assignee() == task.assignee(), "assignee");
    eyre::ensure!(loaded.credentials() == task.credentials(), "credentials");
    eyre::ensure!(loaded.status() == TaskStatus::Submitted, "status");
    eyre::ensure!(loaded.delete_at().is_some(), "default expiry stored");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL server named by AGENT_TASKS_TEST_DATABASE_URL"]
async fn duplicate_insert_is_reported(
    pg_context: Result<PgContext, BoxError>,
) -> Result<(), eyre::Report> {
    let ctx = pg_context.map_err(|err| eyre::eyre!(err))?;
    let task = Task::new_root(draft("worker")?, Months::new(3), &DefaultClock)?;
    let first = task.clone();
    ctx.store.transaction(move |tx| tx.insert(&first)).await?;

    let second = task.clone();
    let result = ctx.store.transaction(move |tx| tx.insert(&second)).await;
    eyre::ensure!(
        matches!(result, Err(TaskStoreError::DuplicateTask(id)) if id == task.id()),
        "expected DuplicateTask, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL server named by AGENT_TASKS_TEST_DATABASE_URL"]
async fn failed_operation_rolls_back(
    pg_context: Result<PgContext, BoxError>,
) -> Result<(), eyre::Report> {
    let ctx = pg_context.map_err(|err| eyre::eyre!(err))?;
    let task = Task::new_root(draft("worker")?, Months::new(3), &DefaultClock)?;
    let id = task.id();

    let result = ctx
        .store
        .transaction(move |tx| -> Result<(), TaskStoreError> {
            tx.insert(&task)?;
            Err(TaskStoreError::Conflict)
        })
        .await;

    eyre::ensure!(matches!(result, Err(TaskStoreError::Conflict)), "operation error kept");
    let found = ctx.store.transaction(move |tx| tx.find(id)).await?;
    eyre::ensure!(found.is_none(), "insert rolled back");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL server named by AGENT_TASKS_TEST_DATABASE_URL"]
async fn expired_root_takes_its_subtree_with_it(
    pg_context: Result<PgContext, BoxError>,
) -> Result<(), eyre::Report> {
    let ctx = pg_context.map_err(|err| eyre::eyre!(err))?;
    let planner = actor("planner")?;
    let root = ctx
        .service
        .create_task(
            &planner,
            CreateTaskRequest::new("root", "lead")
                .with_delete_at(Utc::now() + Duration::minutes(1)),
        )
        .await?;
    let child = ctx
        .service
        .create_task(
            &planner,
            CreateTaskRequest::new("child", "helper")
                .with_parent(root.id()),
        )
        .await?;

    let later = Utc::now() + Duration::hours(1);
    let (expired, removed) = ctx
        .store
        .transaction(move |tx| -> Result<(u64, u64), TaskStoreError> {
            Ok((tx.count_expired(later)?, tx.delete_expired(later)?))
        })
        .await?;
    eyre::ensure!(expired == 1 && removed == 1, "only the root expired");

    let child_id = child.id();
    let leftover = ctx.store.transaction(move |tx| tx.find(child_id)).await?;
    eyre::ensure!(leftover.is_none(), "child removed by cascade");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL server named by AGENT_TASKS_TEST_DATABASE_URL"]
async fn creator_counts_honour_filters(
    pg_context: Result<PgContext, BoxError>,
) -> Result<(), eyre::Report> {
    let ctx = pg_context.map_err(|err| eyre::eyre!(err))?;
    for assignee in ["a", "b"] {
        let task = Task::new_root(draft(assignee)?, Months::new(3), &DefaultClock)?;
        ctx.store.transaction(move |tx| tx.insert(&task)).await?;
    }
    let planner = actor("planner")?;
    let tomorrow = Utc::now() + Duration::days(1);

    let (all, submitted, future) = ctx
        .store
        .transaction(move |tx| -> Result<(u64, u64, u64), TaskStoreError> {
            Ok((
                tx.count_created_by(&planner, &CreatedTaskFilter::default())?,
                tx.count_created_by(
                    &planner,
                    &CreatedTaskFilter {
                        status: Some(TaskStatus::Submitted),
                        ..CreatedTaskFilter::default()
                    },
                )?,
                tx.count_created_by(
                    &planner,
                    &CreatedTaskFilter {
                        created_from: Some(tomorrow),
                        ..CreatedTaskFilter::default()
                    },
                )?,
            ))
        })
        .await?;

    eyre::ensure!(all == 2 && submitted == 2 && future == 0, "unexpected counts");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL server named by AGENT_TASKS_TEST_DATABASE_URL"]
async fn claims_with_equal_timestamps_follow_insertion_order(
    pg_context: Result<PgContext, BoxError>,
) -> Result<(), eyre::Report> {
    let ctx = pg_context.map_err(|err| eyre::eyre!(err))?;
    let worker = actor("worker")?;
    let created_at = Utc::now();
    let mut inserted = Vec::new();
    for n in 0..20 {
        let id = TaskId::new();
        let task = Task::from_persisted(PersistedTaskData {
            id,
            created_at,
            delete_at: None,
            created_by: actor("planner")?,
            assignee: worker.clone(),
            description: format!("batch item {n}"),
            result: String::new(),
            root_task_id: id,
            parent_task_id: None,
            credentials: Credentials::empty(),
            status: TaskStatus::Submitted,
        });
        ctx.store.transaction(move |tx| tx.insert(&task)).await?;
        inserted.push(id);
    }

    let mut claimed = Vec::new();
    for _ in 0..inserted.len() {
        claimed.push(ctx.service.claim_next(&worker).await?.id());
    }

    eyre::ensure!(claimed == inserted, "claims left insertion order");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PostgreSQL server named by AGENT_TASKS_TEST_DATABASE_URL"]
async fn longest_actor_identifier_fits_the_column(
    pg_context: Result<PgContext, BoxError>,
) -> Result<(), eyre::Report> {
    let ctx = pg_context.map_err(|err| eyre::eyre!(err))?;
    let longest = "w".repeat(ActorId::MAX_LEN);
    let task = ctx
        .service
        .create_task(
            &actor(&longest)?,
            CreateTaskRequest::new("wide names", longest.as_str()),
        )
        .await?;

    let id = task.id();
    let loaded = ctx
        .store
        .transaction(move |tx| tx.find(id))
        .await?
        .ok_or_else(|| eyre::eyre!("task missing"))?;
    eyre::ensure!(loaded.assignee().as_str() == longest, "assignee stored in full");
    eyre::ensure!(loaded.created_by().as_str() == longest, "creator stored in full");
    Ok(())
}
