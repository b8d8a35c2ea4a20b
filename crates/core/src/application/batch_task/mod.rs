// Batch Task Service - entry point for recording a batch health-check task

pub mod validation;

pub use validation::{validate_request, BatchTaskRequest};

use crate::application::config::CoordinatorConfig;
use crate::application::outcome::TransactionOutcome;
use crate::application::saga::{
    BrokerSagaStep, CacheSagaStep, DocumentSagaStep, SagaOrchestrator, StoreSagaStep,
};
use crate::application::tcc::{
    BrokerTccParticipant, CacheTccParticipant, DocumentTccParticipant, StoreTccParticipant,
    TccCoordinator,
};
use crate::application::two_phase::{
    BrokerTwoPhaseParticipant, CacheTwoPhaseParticipant, DocumentTwoPhaseParticipant,
    StoreTwoPhaseParticipant, TwoPhaseCommitCoordinator,
};
use crate::domain::BatchTask;
use crate::error::{AppError, Result};
use crate::port::{
    DocumentStore, IdProvider, KeyValueCache, MessageBroker, SagaStep, TaskStore, TccParticipant,
    TimeProvider, TwoPhaseParticipant,
};
use std::sync::Arc;
use tracing::info;

/// The four backends every protocol writes to
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn TaskStore>,
    pub cache: Arc<dyn KeyValueCache>,
    pub documents: Arc<dyn DocumentStore>,
    pub broker: Arc<dyn MessageBroker>,
}

/// Batch task service: validates requests and dispatches to a protocol
pub struct BatchTaskService {
    store: Arc<dyn TaskStore>,
    two_phase: TwoPhaseCommitCoordinator,
    tcc: TccCoordinator,
    saga: SagaOrchestrator,
}

impl BatchTaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        two_phase: TwoPhaseCommitCoordinator,
        tcc: TccCoordinator,
        saga: SagaOrchestrator,
    ) -> Self {
        Self {
            store,
            two_phase,
            tcc,
            saga,
        }
    }

    /// Wire all twelve participants over one set of backends
    ///
    /// # Arguments
    ///
    /// * `backends` - Store, cache, document store and broker ports
    /// * `id_provider` - Transaction / saga id generator
    /// * `time_provider` - Clock for record timestamps
    /// * `config` - Coordinator deadlines
    pub fn from_backends(
        backends: Backends,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: CoordinatorConfig,
    ) -> Self {
        let Backends {
            store,
            cache,
            documents,
            broker,
        } = backends;

        let two_phase_participants: Vec<Arc<dyn TwoPhaseParticipant>> = vec![
            Arc::new(StoreTwoPhaseParticipant::new(
                store.clone(),
                time_provider.clone(),
                config.max_run_duration(),
            )),
            Arc::new(CacheTwoPhaseParticipant::new(cache.clone())),
            Arc::new(DocumentTwoPhaseParticipant::new(documents.clone(), time_provider.clone())),
            Arc::new(BrokerTwoPhaseParticipant::new(broker.clone())),
        ];
        let tcc_participants: Vec<Arc<dyn TccParticipant>> = vec![
            Arc::new(StoreTccParticipant::new(store.clone(), time_provider.clone())),
            Arc::new(CacheTccParticipant::new(cache.clone())),
            Arc::new(DocumentTccParticipant::new(documents.clone(), time_provider.clone())),
            Arc::new(BrokerTccParticipant::new(broker.clone())),
        ];
        let saga_steps: Vec<Arc<dyn SagaStep>> = vec![
            Arc::new(StoreSagaStep::new(store.clone(), time_provider.clone())),
            Arc::new(CacheSagaStep::new(cache)),
            Arc::new(DocumentSagaStep::new(documents, time_provider.clone())),
            Arc::new(BrokerSagaStep::new(broker)),
        ];

        Self::new(
            store,
            TwoPhaseCommitCoordinator::new(
                two_phase_participants,
                id_provider.clone(),
                time_provider.clone(),
                config,
            ),
            TccCoordinator::new(
                tcc_participants,
                id_provider.clone(),
                time_provider.clone(),
                config,
            ),
            SagaOrchestrator::new(saga_steps, id_provider, time_provider, config),
        )
    }

    /// Record a task with Two-Phase Commit
    ///
    /// # Errors
    /// - `AppError::Validation` for a malformed request; no backend is touched
    pub async fn create_with_two_phase_commit(
        &self,
        req: BatchTaskRequest,
    ) -> Result<TransactionOutcome> {
        let names = validate_request(&req)?;
        info!(task_id = %req.task_id, services = names.len(), "Creating batch task with 2PC");
        Ok(self.two_phase.execute_transaction(&req.task_id, &names).await)
    }

    /// Record a task with Try-Confirm-Cancel
    pub async fn create_with_tcc(&self, req: BatchTaskRequest) -> Result<TransactionOutcome> {
        let names = validate_request(&req)?;
        info!(task_id = %req.task_id, services = names.len(), "Creating batch task with TCC");
        Ok(self.tcc.execute_transaction(&req.task_id, &names).await)
    }

    /// Record a task with a compensating saga
    pub async fn create_with_saga(&self, req: BatchTaskRequest) -> Result<TransactionOutcome> {
        let names = validate_request(&req)?;
        info!(task_id = %req.task_id, services = names.len(), "Creating batch task with Saga");
        Ok(self.saga.execute_saga(&req.task_id, &names).await)
    }

    /// Look up the relational record of a task
    ///
    /// # Errors
    /// - `AppError::NotFound` if no record exists
    pub async fn find_task(&self, task_id: &str) -> Result<BatchTask> {
        validation::validate_task_id(task_id)?;
        self.store
            .find_by_task_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {}", task_id)))
    }
}
