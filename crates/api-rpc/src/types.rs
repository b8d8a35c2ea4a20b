//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use healthcheck_core::application::TransactionOutcome;
use healthcheck_core::domain::BatchTask;
use serde::{Deserialize, Serialize};

/// batch.two_phase.v1 / batch.tcc.v1 / batch.saga.v1 - Record a batch task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchTaskRequest {
    pub task_id: String,
    pub service_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchTaskResponse {
    pub task_id: String,
    pub pattern: String,
    pub success: bool,
    pub message: String,
}

impl From<TransactionOutcome> for CreateBatchTaskResponse {
    fn from(outcome: TransactionOutcome) -> Self {
        Self {
            task_id: outcome.task_id,
            pattern: outcome.pattern.label().to_string(),
            success: outcome.success,
            message: outcome.message,
        }
    }
}

/// batch.get.v1 - Look up a stored task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBatchTaskRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBatchTaskResponse {
    pub task_id: String,
    pub service_names: Vec<String>,
    pub status: String,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl From<BatchTask> for GetBatchTaskResponse {
    fn from(task: BatchTask) -> Self {
        Self {
            service_names: task.service_names.to_vec(),
            task_id: task.task_id,
            status: task.status.to_string(),
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}
