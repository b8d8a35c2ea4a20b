// Shared store-participant helpers

use crate::domain::{Backend, BatchTask, RowId, StepHandle, TaskStatus, TransactionContext};
use crate::error::{AppError, Result};
use crate::port::TaskStore;
use tracing::debug;

/// Insert `task`, first reclaiming a stale record for the same task id
///
/// An existing record accepted by `reclaimable` is deleted; any other
/// existing record makes the insert fail with `Conflict`.
pub(crate) async fn insert_reclaiming<F>(
    store: &dyn TaskStore,
    task: &BatchTask,
    reclaimable: F,
) -> Result<RowId>
where
    F: Fn(&BatchTask) -> bool + Send,
{
    if let Some(existing) = store.find_by_task_id(&task.task_id).await? {
        if !reclaimable(&existing) {
            return Err(AppError::Conflict(format!(
                "task {} already exists with status {}",
                task.task_id, existing.status
            )));
        }
        if let Some(id) = existing.id {
            store.delete(id).await?;
            debug!(
                task_id = %task.task_id,
                status = %existing.status,
                "Reclaimed stale task record"
            );
        }
    }

    store.insert(task).await
}

/// Insert the run's record, tracking it in the context from the start
///
/// A `PendingRow` marker is left in the context before the store is called,
/// so a run cut off mid-insert can still find and undo its row. A `Conflict`
/// means nothing was written and the marker is dropped.
pub(crate) async fn insert_tracked<F>(
    store: &dyn TaskStore,
    ctx: &mut TransactionContext,
    task: &BatchTask,
    reclaimable: F,
) -> Result<RowId>
where
    F: Fn(&BatchTask) -> bool + Send,
{
    ctx.put_handle(Backend::Store, StepHandle::PendingRow);

    match insert_reclaiming(store, task, reclaimable).await {
        Ok(id) => {
            ctx.put_handle(Backend::Store, StepHandle::Row(id));
            Ok(id)
        }
        Err(e) => {
            if matches!(e, AppError::Conflict(_)) {
                ctx.take_handle(Backend::Store);
            }
            Err(e)
        }
    }
}

/// Row written by this run, resolving an unacknowledged insert
///
/// For `PendingRow` the record is looked up by task id and accepted only if
/// it still has the status it was written with and the run's start time.
pub(crate) async fn owned_row(
    store: &dyn TaskStore,
    ctx: &TransactionContext,
    handle: Option<StepHandle>,
    written_as: TaskStatus,
) -> Result<Option<RowId>> {
    match handle {
        Some(StepHandle::Row(id)) => Ok(Some(id)),
        Some(StepHandle::PendingRow) => {
            let row = store.find_by_task_id(ctx.task_id()).await?;
            Ok(row
                .filter(|t| t.status == written_as && t.created_at == ctx.started_at())
                .and_then(|t| t.id))
        }
        _ => Ok(None),
    }
}

/// Load the row behind `id`, failing if it vanished
pub(crate) async fn load_row(store: &dyn TaskStore, id: RowId) -> Result<BatchTask> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task row {}", id)))
}

/// Row id held by the store participant, if the insert was acknowledged
pub(crate) fn row_handle(ctx: &TransactionContext) -> Option<RowId> {
    match ctx.handle(Backend::Store) {
        Some(StepHandle::Row(id)) => Some(*id),
        _ => None,
    }
}

/// Move the row to the negative status `next` when that is still legal
///
/// `completed_at` is cleared. Returns whether the row changed. A row that is
/// gone, or already past the point where `next` applies, is left alone.
pub(crate) async fn revert_row(
    store: &dyn TaskStore,
    id: RowId,
    next: TaskStatus,
) -> Result<bool> {
    let Some(mut task) = store.find_by_id(id).await? else {
        return Ok(false);
    };
    if task.status == next || task.transition(next).is_err() {
        return Ok(false);
    }
    store.update_status(id, task.status, None).await?;
    Ok(true)
}
