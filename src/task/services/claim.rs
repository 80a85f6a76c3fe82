//! Claim protocol handing a submitted task to exactly one caller.

use super::error::{TaskLifecycleError, TaskLifecycleResult};
use crate::task::{
    domain::{ActorId, Task, TaskStatus},
    ports::TaskTransaction,
};

/// Claims the oldest submitted task assigned to `actor`.
///
/// Each candidate is locked before its status is trusted. A candidate that
/// another transaction claimed first is skipped in favour of the next one.
pub(super) fn claim_next(
    tx: &mut dyn TaskTransaction,
    actor: &ActorId,
) -> TaskLifecycleResult<Task> {
    let mut skipped = Vec::new();

    while let Some(candidate) = tx.next_claim_candidate(actor, &skipped)? {
        match tx.lock(candidate)? {
            Some(mut task) if task.status() == TaskStatus::Submitted && task.is_assignee(actor) => {
                task.transition_to(TaskStatus::Working)?;
                tx.save(&task)?;
                return Ok(task);
            }
            _ => {
                tracing::debug!(task_id = %candidate, actor = %actor, "claim candidate lost");
                skipped.push(candidate);
            }
        }
    }

    Err(TaskLifecycleError::NothingToClaim(actor.clone()))
}
