// Task Store Port (relational task-record store)

use crate::domain::{BatchTask, RowId, TaskStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for batch task records
///
/// `task_id` is unique: inserting a second record for the same task id is a
/// `Conflict`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a record with its current status, returning the generated row id
    async fn insert(&self, task: &BatchTask) -> Result<RowId>;

    /// Update status (and completion timestamp) of a row
    ///
    /// # Errors
    /// - `AppError::NotFound` if the row does not exist
    async fn update_status(
        &self,
        id: RowId,
        status: TaskStatus,
        completed_at: Option<i64>,
    ) -> Result<()>;

    /// Find a record by caller-supplied task id
    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<BatchTask>>;

    /// Find a record by row id
    async fn find_by_id(&self, id: RowId) -> Result<Option<BatchTask>>;

    /// Delete a row; returns whether a row was removed
    async fn delete(&self, id: RowId) -> Result<bool>;
}
