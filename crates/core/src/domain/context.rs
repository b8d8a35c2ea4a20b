// Transaction / Saga Context
//
// Ephemeral, coordinator-owned state for one protocol run. Participants keep
// their compensation handles here instead of in adapter fields, so concurrent
// transactions never share handle storage.

use crate::domain::{Backend, Protocol, RowId, ServiceNames, TaskId, TaskMessage};
use std::collections::HashMap;

/// Generated transaction / saga identifier (UUID v4)
pub type TransactionId = String;

/// Protocol phase of a single coordinator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Initialized,

    // 2PC
    Preparing,
    Prepared,
    Committing,
    Committed,
    RollingBack,
    RolledBack,

    // TCC
    Trying,
    Reserved,
    Confirming,
    Confirmed,
    Cancelling,
    Cancelled,

    // Saga
    Executing,
    Completed,
    Compensating,
    Compensated,
}

/// Opaque per-participant data needed to finish or undo a forward action
#[derive(Debug, Clone, PartialEq)]
pub enum StepHandle {
    /// Relational row written by the store participant
    Row(RowId),
    /// Store insert issued but not yet acknowledged
    PendingRow,
    /// 2PC cache staging key plus the final status key it will be promoted to
    StagedCacheKey { staging_key: String, status_key: String },
    /// TCC cache reservation: status key and the lock guarding it
    CacheReservation { status_key: String, lock_key: String },
    /// Cache key written with an immediate commit
    CacheKey(String),
    /// 2PC document sitting in the staging collection
    StagedDocument {
        collection: String,
        id: String,
        document: serde_json::Value,
    },
    /// Document written to its final collection
    Document { collection: String, id: String },
    /// Broker message; `published` once it has gone on the wire
    Message { message: TaskMessage, published: bool },
}

/// Informational per-participant outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Prepared,
    Committed,
    RolledBack,
    Reserved,
    Confirmed,
    Cancelled,
    Executed,
    Compensated,
    Failed(String),
}

impl StepResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepResult::Failed(_))
    }
}

/// Per-invocation context threaded through every participant call
#[derive(Debug, Clone)]
pub struct TransactionContext {
    id: TransactionId,
    protocol: Protocol,
    phase: TransactionPhase,
    task_id: TaskId,
    service_names: ServiceNames,
    started_at: i64,
    step_data: HashMap<Backend, StepHandle>,
    step_results: HashMap<Backend, StepResult>,
}

impl TransactionContext {
    pub fn new(
        id: impl Into<String>,
        protocol: Protocol,
        task_id: impl Into<String>,
        service_names: ServiceNames,
        started_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            protocol,
            phase: TransactionPhase::Initialized,
            task_id: task_id.into(),
            service_names,
            started_at,
            step_data: HashMap::new(),
            step_results: HashMap::new(),
        }
    }

    /// Transaction id (the saga id for saga runs)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: TransactionPhase) {
        tracing::debug!(transaction_id = %self.id, from = ?self.phase, to = ?phase, "Phase change");
        self.phase = phase;
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn service_names(&self) -> &ServiceNames {
        &self.service_names
    }

    /// Epoch ms at which the coordinator started this run
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn put_handle(&mut self, backend: Backend, handle: StepHandle) {
        self.step_data.insert(backend, handle);
    }

    pub fn handle(&self, backend: Backend) -> Option<&StepHandle> {
        self.step_data.get(&backend)
    }

    pub fn handle_mut(&mut self, backend: Backend) -> Option<&mut StepHandle> {
        self.step_data.get_mut(&backend)
    }

    /// Remove and return the handle; a second call yields `None`
    pub fn take_handle(&mut self, backend: Backend) -> Option<StepHandle> {
        self.step_data.remove(&backend)
    }

    pub fn record(&mut self, backend: Backend, result: StepResult) {
        self.step_results.insert(backend, result);
    }

    pub fn result(&self, backend: Backend) -> Option<&StepResult> {
        self.step_results.get(&backend)
    }

    /// Backends whose latest recorded result equals `result`, in forward order
    pub fn backends_with(&self, result: &StepResult) -> Vec<Backend> {
        Backend::ORDER
            .into_iter()
            .filter(|b| self.step_results.get(b) == Some(result))
            .collect()
    }

    /// Backends whose latest recorded result is a failure, in forward order
    pub fn failed_backends(&self) -> Vec<Backend> {
        Backend::ORDER
            .into_iter()
            .filter(|b| self.step_results.get(b).is_some_and(StepResult::is_failure))
            .collect()
    }
}
