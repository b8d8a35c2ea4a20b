// Try-Confirm-Cancel Coordinator

mod participants;

pub use participants::{
    BrokerTccParticipant, CacheTccParticipant, DocumentTccParticipant, StoreTccParticipant,
};

use crate::application::config::CoordinatorConfig;
use crate::application::guard::guarded;
use crate::application::outcome::TransactionOutcome;
use crate::domain::{Protocol, ServiceNames, StepResult, TransactionContext, TransactionPhase};
use crate::port::{IdProvider, TccParticipant, TimeProvider};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub const CONFIRMED_MESSAGE: &str = "Transaction confirmed successfully";
pub const CANCELLED_MESSAGE: &str = "Transaction failed and cancelled";

/// Drives try -> confirm (or cancel) across all TCC participants
pub struct TccCoordinator {
    participants: Vec<Arc<dyn TccParticipant>>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: CoordinatorConfig,
}

impl TccCoordinator {
    /// Create a coordinator; participants are visited in backend order
    pub fn new(
        mut participants: Vec<Arc<dyn TccParticipant>>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: CoordinatorConfig,
    ) -> Self {
        participants.sort_by_key(|p| p.backend());
        Self {
            participants,
            id_provider,
            time_provider,
            config,
        }
    }

    /// Run one TCC transaction recording `task_id` on every participant
    ///
    /// Any try or confirm failure cancels every participant in reverse
    /// order, which also releases the cache reservation lock.
    pub async fn execute_transaction(
        &self,
        task_id: &str,
        service_names: &ServiceNames,
    ) -> TransactionOutcome {
        let mut ctx = TransactionContext::new(
            self.id_provider.generate_id(),
            Protocol::Tcc,
            task_id,
            service_names.clone(),
            self.time_provider.now_millis(),
        );
        info!(transaction_id = %ctx.id(), task_id = %task_id, "Starting TCC transaction");

        let succeeded = self.run_phase(&mut ctx, Phase::Try).await
            && self.run_phase(&mut ctx, Phase::Confirm).await;

        if succeeded {
            ctx.set_phase(TransactionPhase::Confirmed);
            info!(transaction_id = %ctx.id(), task_id = %task_id, "TCC transaction confirmed");
            return TransactionOutcome::succeeded(&ctx, CONFIRMED_MESSAGE);
        }

        self.cancel_all(&mut ctx).await;
        TransactionOutcome::failed(&ctx, CANCELLED_MESSAGE)
    }

    /// Returns `false` at the first failing participant
    async fn run_phase(&self, ctx: &mut TransactionContext, phase: Phase) -> bool {
        ctx.set_phase(phase.running());
        let deadline = Instant::now() + self.config.phase_timeout;

        for participant in &self.participants {
            let backend = participant.backend();
            let result = match phase {
                Phase::Try => guarded(deadline, participant.try_reserve(ctx)).await,
                Phase::Confirm => guarded(deadline, participant.confirm(ctx)).await,
            };

            match result {
                Ok(()) => ctx.record(backend, phase.success()),
                Err(e) => {
                    warn!(
                        transaction_id = %ctx.id(),
                        backend = %backend,
                        phase = phase.name(),
                        error = %e,
                        "TCC participant failed"
                    );
                    ctx.record(backend, StepResult::Failed(e.to_string()));
                    return false;
                }
            }
        }

        if let Phase::Try = phase {
            ctx.set_phase(TransactionPhase::Reserved);
        }
        true
    }

    /// Cancel every participant in reverse order, continuing past failures
    async fn cancel_all(&self, ctx: &mut TransactionContext) {
        ctx.set_phase(TransactionPhase::Cancelling);
        info!(transaction_id = %ctx.id(), "Cancelling TCC transaction");

        for participant in self.participants.iter().rev() {
            let backend = participant.backend();
            let had_handle = ctx.handle(backend).is_some();
            let deadline = Instant::now() + self.config.compensation_timeout;

            match guarded(deadline, participant.cancel(ctx)).await {
                Ok(()) if had_handle => ctx.record(backend, StepResult::Cancelled),
                Ok(()) => {}
                Err(e) => {
                    error!(
                        transaction_id = %ctx.id(),
                        backend = %backend,
                        error = %e,
                        "Cancel failed; continuing with remaining participants"
                    );
                }
            }
        }
        ctx.set_phase(TransactionPhase::Cancelled);
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Try,
    Confirm,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Try => "try",
            Phase::Confirm => "confirm",
        }
    }

    fn running(self) -> TransactionPhase {
        match self {
            Phase::Try => TransactionPhase::Trying,
            Phase::Confirm => TransactionPhase::Confirming,
        }
    }

    fn success(self) -> StepResult {
        match self {
            Phase::Try => StepResult::Reserved,
            Phase::Confirm => StepResult::Confirmed,
        }
    }
}
