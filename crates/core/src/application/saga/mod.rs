// Saga Orchestrator
//
// Steps commit locally one after another. On the first failure the steps
// that already committed are compensated in reverse; later steps are never
// attempted.

mod steps;

pub use steps::{BrokerSagaStep, CacheSagaStep, DocumentSagaStep, StoreSagaStep};

use crate::application::config::CoordinatorConfig;
use crate::application::guard::guarded;
use crate::application::outcome::TransactionOutcome;
use crate::domain::{Protocol, ServiceNames, StepResult, TransactionContext, TransactionPhase};
use crate::port::{IdProvider, SagaStep, TimeProvider};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub const COMPLETED_MESSAGE: &str = "Saga transaction completed successfully";
pub const COMPENSATED_MESSAGE: &str = "Saga transaction failed and compensated";

pub struct SagaOrchestrator {
    steps: Vec<Arc<dyn SagaStep>>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: CoordinatorConfig,
}

impl SagaOrchestrator {
    /// Create an orchestrator; steps run in backend order
    pub fn new(
        mut steps: Vec<Arc<dyn SagaStep>>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: CoordinatorConfig,
    ) -> Self {
        steps.sort_by_key(|s| s.backend());
        Self {
            steps,
            id_provider,
            time_provider,
            config,
        }
    }

    /// Run one saga recording `task_id` on every step
    pub async fn execute_saga(
        &self,
        task_id: &str,
        service_names: &ServiceNames,
    ) -> TransactionOutcome {
        let mut ctx = TransactionContext::new(
            self.id_provider.generate_id(),
            Protocol::Saga,
            task_id,
            service_names.clone(),
            self.time_provider.now_millis(),
        );
        info!(saga_id = %ctx.id(), task_id = %task_id, "Starting saga");
        ctx.set_phase(TransactionPhase::Executing);

        let mut executed: Vec<Arc<dyn SagaStep>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let backend = step.backend();
            let deadline = Instant::now() + self.config.phase_timeout;

            match guarded(deadline, step.execute(&mut ctx)).await {
                Ok(()) => {
                    ctx.record(backend, StepResult::Executed);
                    executed.push(Arc::clone(step));
                }
                Err(e) => {
                    warn!(
                        saga_id = %ctx.id(),
                        step = step.name(),
                        error = %e,
                        "Saga step failed"
                    );
                    ctx.record(backend, StepResult::Failed(e.to_string()));
                    self.compensate(&mut ctx, &executed).await;
                    return TransactionOutcome::failed(&ctx, COMPENSATED_MESSAGE);
                }
            }
        }

        ctx.set_phase(TransactionPhase::Completed);
        info!(saga_id = %ctx.id(), task_id = %task_id, "Saga completed");
        TransactionOutcome::succeeded(&ctx, COMPLETED_MESSAGE)
    }

    /// Compensate `executed` in reverse, continuing past failures
    async fn compensate(&self, ctx: &mut TransactionContext, executed: &[Arc<dyn SagaStep>]) {
        ctx.set_phase(TransactionPhase::Compensating);
        info!(saga_id = %ctx.id(), steps = executed.len(), "Compensating saga");

        for step in executed.iter().rev() {
            let deadline = Instant::now() + self.config.compensation_timeout;
            match guarded(deadline, step.compensate(ctx)).await {
                Ok(()) => ctx.record(step.backend(), StepResult::Compensated),
                Err(e) => {
                    error!(
                        saga_id = %ctx.id(),
                        step = step.name(),
                        error = %e,
                        "Compensation failed; continuing with earlier steps"
                    );
                }
            }
        }
        ctx.set_phase(TransactionPhase::Compensated);
    }
}
