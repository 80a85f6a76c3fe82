//! Tree propagation applied inside lifecycle transactions.

use super::error::{TaskLifecycleError, TaskLifecycleResult};
use crate::task::{
    domain::{Task, TaskId, TaskStatus},
    ports::TaskTransaction,
};

/// Locks the parent of `task_id`, then the task itself, and returns the task.
///
/// Row locks in a lifecycle transaction are taken from the root down. The
/// parent identifier never changes, so it is read without a lock.
pub(super) fn lock_with_parent(
    tx: &mut dyn TaskTransaction,
    task_id: TaskId,
) -> TaskLifecycleResult<Task> {
    let parent_id = tx
        .find(task_id)?
        .ok_or(TaskLifecycleError::NotFound(task_id))?
        .parent_task_id();
    if let Some(parent_id) = parent_id {
        tx.lock(parent_id)?;
    }
    tx.lock(task_id)?.ok_or(TaskLifecycleError::NotFound(task_id))
}

/// Cancels every active descendant of `ancestor` and returns them.
///
/// The walk is depth first over an explicit stack. Children that are not
/// active are left untouched and their subtrees are not visited.
pub(super) fn cancel_descendants(
    tx: &mut dyn TaskTransaction,
    ancestor: TaskId,
) -> TaskLifecycleResult<Vec<Task>> {
    let mut stack = vec![ancestor];
    let mut canceled = Vec::new();

    while let Some(parent) = stack.pop() {
        let children = tx.lock_children(parent, &TaskStatus::ACTIVE)?;
        if children.is_empty() {
            continue;
        }
        let mut ids = Vec::with_capacity(children.len());
        for mut child in children {
            child.cancel()?;
            ids.push(child.id());
            stack.push(child.id());
            canceled.push(child);
        }
        tx.set_status(&ids, TaskStatus::Canceled)?;
    }

    Ok(canceled)
}

/// Moves the parent of `task` back to `submitted` once all of its children
/// are completed or canceled, returning the reopened parent.
///
/// The parent row is locked before its children are counted so concurrent
/// sibling resolutions observe each other.
pub(super) fn roll_up_parent(
    tx: &mut dyn TaskTransaction,
    task: &Task,
) -> TaskLifecycleResult<Option<Task>> {
    let Some(parent_id) = task.parent_task_id() else {
        return Ok(None);
    };
    let Some(mut parent) = tx.lock(parent_id)? else {
        return Ok(None);
    };
    if parent.status() != TaskStatus::Waiting {
        return Ok(None);
    }

    let siblings = tx.count_children(parent_id, None)?;
    let resolved = tx.count_children(parent_id, Some(&TaskStatus::RESOLVED))?;
    if siblings == 0 || siblings != resolved {
        return Ok(None);
    }

    parent.transition_to(TaskStatus::Submitted)?;
    tx.save(&parent)?;
    Ok(Some(parent))
}
