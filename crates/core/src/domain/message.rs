// Protocol-local copies of the task record
//
// The cache holds plain status strings; the document store and the broker
// hold the JSON shapes defined here.

use crate::domain::{ServiceNames, TaskStatus};
use serde::{Deserialize, Serialize};

/// Broker payload announcing a task's status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessage {
    pub task_id: String,
    pub service_names: Vec<String>,
    pub status: TaskStatus,
}

impl TaskMessage {
    pub fn new(
        task_id: impl Into<String>,
        service_names: &ServiceNames,
        status: TaskStatus,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            service_names: service_names.to_vec(),
            status,
        }
    }

    /// Copy of this message carrying a different status
    pub fn with_status(&self, status: TaskStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Task log document written to the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLogDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saga_id: Option<String>,
    pub task_id: String,
    pub service_names: Vec<String>,
    pub status: TaskStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl TaskLogDocument {
    pub fn new(
        task_id: impl Into<String>,
        service_names: &ServiceNames,
        status: TaskStatus,
        created_at: i64,
    ) -> Self {
        Self {
            transaction_id: None,
            saga_id: None,
            task_id: task_id.into(),
            service_names: service_names.to_vec(),
            status,
            created_at,
            completed_at: None,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
