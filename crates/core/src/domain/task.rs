// Batch Health-Check Task Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Caller-supplied task identifier (unique per logical task)
pub type TaskId = String;

/// Relational row identifier (generated by the store)
pub type RowId = i64;

/// Task lifecycle status (union of all three protocols' needs)
///
/// `Prepared` is 2PC-only, `Reserved` is TCC-only. Saga writes `Completed`
/// directly and reverts to `Failed` on compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Prepared,
    Reserved,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Prepared => "PREPARED",
            TaskStatus::Reserved => "RESERVED",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    /// Negative terminal states; a record in one of these may be reclaimed
    pub fn is_negative_terminal(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Cancelled)
    }

    /// Whether `self -> next` is a legal lifecycle transition
    ///
    /// `Completed -> Failed | Cancelled` exists only for compensation
    /// (saga undo, TCC cancel after a failed confirm phase).
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Pending, Processing | Prepared | Reserved | Completed | Failed | Cancelled) => true,
            (Processing, Prepared | Reserved | Completed | Failed | Cancelled) => true,
            (Prepared, Completed | Failed | Cancelled) => true,
            (Reserved, Completed | Failed | Cancelled) => true,
            (Completed, Failed | Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "PROCESSING" => Ok(TaskStatus::Processing),
            "PREPARED" => Ok(TaskStatus::Prepared),
            "RESERVED" => Ok(TaskStatus::Reserved),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            "CANCELLED" => Ok(TaskStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Member service names of a batch task (unique, order irrelevant)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceNames(BTreeSet<String>);

impl ServiceNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ServiceNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Batch health-check task record
///
/// Owned by the relational store; the other backends hold protocol-local
/// copies (cache key, document, queued message) keyed by the same `task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTask {
    /// Row id, `None` until the store has persisted the record
    pub id: Option<RowId>,
    pub task_id: TaskId,
    pub service_names: ServiceNames,
    pub status: TaskStatus,
    pub created_at: i64, // epoch ms
    pub completed_at: Option<i64>,
}

impl BatchTask {
    /// Create a new PENDING task
    ///
    /// # Arguments
    ///
    /// * `task_id` - Caller-supplied task identifier
    /// * `service_names` - Member services
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(task_id: impl Into<String>, service_names: ServiceNames, created_at: i64) -> Self {
        Self {
            id: None,
            task_id: task_id.into(),
            service_names,
            status: TaskStatus::Pending,
            created_at,
            completed_at: None,
        }
    }

    /// Same task, starting in the given status (used by forward actions)
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Transition to `next`, rejecting illegal moves
    pub fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Transition to COMPLETED and stamp `completed_at`
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(TaskStatus::Completed)?;
        self.completed_at = Some(now_millis);
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
