// SQLite TaskStore Implementation

use async_trait::async_trait;
use healthcheck_core::domain::{BatchTask, RowId, ServiceNames, TaskStatus};
use healthcheck_core::error::{AppError, Result};
use healthcheck_core::port::TaskStore;
use sqlx::SqlitePool;
use tracing::debug;

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE constraint failed
                        AppError::Conflict(format!(
                            "Unique constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    "5" => {
                        // SQLITE_BUSY - database is locked
                        AppError::Database(format!(
                            "Database locked (SQLITE_BUSY): {}",
                            db_err.message()
                        ))
                    }
                    "13" => {
                        // SQLITE_FULL - database or disk is full
                        AppError::Database(format!("Database full: {}", db_err.message()))
                    }
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        // Connection, pool, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert(&self, task: &BatchTask) -> Result<RowId> {
        let service_names = serde_json::to_string(&task.service_names)?;

        let result = sqlx::query(
            r#"
            INSERT INTO batch_health_check_tasks (
                task_id, service_names, status, created_at, completed_at
            ) VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.task_id)
        .bind(service_names)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .bind(task.completed_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        debug!(task_id = %task.task_id, row_id = id, status = %task.status, "Inserted task record");
        Ok(id)
    }

    async fn update_status(
        &self,
        id: RowId,
        status: TaskStatus,
        completed_at: Option<i64>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE batch_health_check_tasks SET status = ?, completed_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("task row {}", id)));
        }
        Ok(())
    }

    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<BatchTask>> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM batch_health_check_tasks WHERE task_id = ?",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TaskRow::into_task).transpose()
    }

    async fn find_by_id(&self, id: RowId) -> Result<Option<BatchTask>> {
        let row =
            sqlx::query_as::<_, TaskRow>("SELECT * FROM batch_health_check_tasks WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(TaskRow::into_task).transpose()
    }

    async fn delete(&self, id: RowId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM batch_health_check_tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    task_id: String,
    service_names: String, // JSON array
    status: String,
    created_at: i64,
    completed_at: Option<i64>,
}

impl TaskRow {
    fn into_task(self) -> Result<BatchTask> {
        let service_names: ServiceNames = serde_json::from_str(&self.service_names)?;
        let status: TaskStatus = self.status.parse()?;

        Ok(BatchTask {
            id: Some(self.id),
            task_id: self.task_id,
            service_names,
            status,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn store() -> SqliteTaskStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteTaskStore::new(pool)
    }

    fn task(task_id: &str, status: TaskStatus) -> BatchTask {
        BatchTask::new(task_id, ServiceNames::new(["postgres", "redis"]), 1_000).with_status(status)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = store().await;
        let id = store.insert(&task("t1", TaskStatus::Prepared)).await.unwrap();

        let found = store.find_by_task_id("t1").await.unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.status, TaskStatus::Prepared);
        assert_eq!(found.service_names, ServiceNames::new(["redis", "postgres"]));
        assert_eq!(found.created_at, 1_000);
        assert!(found.completed_at.is_none());

        assert_eq!(store.find_by_id(id).await.unwrap(), Some(found));
    }

    #[tokio::test]
    async fn test_duplicate_task_id_is_conflict() {
        let store = store().await;
        store.insert(&task("t1", TaskStatus::Reserved)).await.unwrap();

        let result = store.insert(&task("t1", TaskStatus::Reserved)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = store().await;
        let id = store.insert(&task("t1", TaskStatus::Prepared)).await.unwrap();

        store
            .update_status(id, TaskStatus::Completed, Some(2_000))
            .await
            .unwrap();

        let found = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.status, TaskStatus::Completed);
        assert_eq!(found.completed_at, Some(2_000));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = store().await;
        let result = store.update_status(42, TaskStatus::Completed, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store().await;
        let id = store.insert(&task("t1", TaskStatus::Prepared)).await.unwrap();

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.find_by_task_id("t1").await.unwrap().is_none());
    }
}
