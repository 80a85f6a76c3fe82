//! Concurrent claim tests against the in-memory store.

use super::helpers::{Engine, actor, engine};
use agent_task_manager::task::{domain::TaskStatus, services::TaskLifecycleError};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_hand_out_a_task_once(engine: Engine) -> Result<(), eyre::Report> {
    let task = engine.create("planner", "worker", None).await?;
    let worker = actor("worker")?;

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = engine.service.clone();
            let claimant = worker.clone();
            tokio::spawn(async move { service.claim_next(&claimant).await })
        })
        .collect();

    let mut claimed = Vec::new();
    let mut empty = 0_usize;
    for attempt in attempts {
        match attempt.await? {
            Ok(won) => claimed.push(won.id()),
            Err(TaskLifecycleError::NothingToClaim(_)) => empty += 1,
            Err(other) => return Err(other.into()),
        }
    }

    eyre::ensure!(claimed == vec![task.id()], "exactly one claim wins, got {claimed:?}");
    eyre::ensure!(empty == 7, "losers see nothing to claim");
    eyre::ensure!(
        engine.status(task.id()).await? == TaskStatus::Working,
        "claimed task is working"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_split_distinct_tasks(engine: Engine) -> Result<(), eyre::Report> {
    for _ in 0..5 {
        engine.create("planner", "worker", None).await?;
    }
    let worker = actor("worker")?;

    let attempts: Vec<_> = (0..5)
        .map(|_| {
            let service = engine.service.clone();
            let claimant = worker.clone();
            tokio::spawn(async move { service.claim_next(&claimant).await })
        })
        .collect();

    let mut ids = Vec::new();
    for attempt in attempts {
        ids.push(attempt.await??.id());
    }
    ids.sort();
    ids.dedup();
    eyre::ensure!(ids.len() == 5, "every claim received a distinct task");
    Ok(())
}
