// Batch task request validation

use crate::application::constants::MAX_TASK_ID_LEN;
use crate::domain::ServiceNames;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Create-task request shared by all three protocols
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTaskRequest {
    pub task_id: String,
    pub service_names: Vec<String>,
}

impl BatchTaskRequest {
    pub fn new<I, S>(task_id: impl Into<String>, service_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            task_id: task_id.into(),
            service_names: service_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Validate a request, returning the de-duplicated service names
pub fn validate_request(req: &BatchTaskRequest) -> Result<ServiceNames> {
    validate_task_id(&req.task_id)?;

    if req.service_names.is_empty() {
        return Err(AppError::Validation(
            "service_names cannot be empty".to_string(),
        ));
    }

    if let Some(pos) = req.service_names.iter().position(|n| n.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "service_names[{}] cannot be empty",
            pos
        )));
    }

    Ok(req.service_names.iter().map(String::as_str).collect())
}

pub fn validate_task_id(task_id: &str) -> Result<()> {
    if task_id.trim().is_empty() {
        return Err(AppError::Validation("task_id cannot be empty".to_string()));
    }

    if task_id.chars().count() > MAX_TASK_ID_LEN {
        return Err(AppError::Validation(format!(
            "task_id too long (max {} characters)",
            MAX_TASK_ID_LEN
        )));
    }

    Ok(())
}
