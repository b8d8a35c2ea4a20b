// Two-Phase Commit Coordinator

mod participants;

pub use participants::{
    BrokerTwoPhaseParticipant, CacheTwoPhaseParticipant, DocumentTwoPhaseParticipant,
    StoreTwoPhaseParticipant,
};

use crate::application::config::CoordinatorConfig;
use crate::application::guard::guarded;
use crate::application::outcome::{Inconsistency, TransactionOutcome};
use crate::domain::{Protocol, ServiceNames, StepResult, TransactionContext, TransactionPhase};
use crate::port::{IdProvider, TimeProvider, TwoPhaseParticipant};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub const COMMITTED_MESSAGE: &str = "Transaction committed successfully";
pub const ROLLED_BACK_MESSAGE: &str = "Transaction failed and rolled back";
pub const PARTIAL_COMMIT_MESSAGE: &str =
    "Commit phase partially failed; participants are inconsistent";

/// Drives prepare -> commit (or rollback) across all 2PC participants
pub struct TwoPhaseCommitCoordinator {
    participants: Vec<Arc<dyn TwoPhaseParticipant>>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: CoordinatorConfig,
}

impl TwoPhaseCommitCoordinator {
    /// Create a coordinator
    ///
    /// Participants are visited in backend order (store, cache, document
    /// store, broker) regardless of the order they are passed in.
    ///
    /// # Arguments
    ///
    /// * `participants` - One participant per backend
    /// * `id_provider` - Transaction id generator
    /// * `time_provider` - Clock used for the context start time
    /// * `config` - Phase and compensation deadlines
    pub fn new(
        mut participants: Vec<Arc<dyn TwoPhaseParticipant>>,
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

    /// Run one 2PC transaction recording `task_id` on every participant
    pub async fn execute_transaction(
        &self,
        task_id: &str,
        service_names: &ServiceNames,
    ) -> TransactionOutcome {
        let mut ctx = TransactionContext::new(
            self.id_provider.generate_id(),
            Protocol::TwoPhaseCommit,
            task_id,
            service_names.clone(),
            self.time_provider.now_millis(),
        );
        info!(transaction_id = %ctx.id(), task_id = %task_id, "Starting 2PC transaction");

        // Phase 1: prepare
        if !self.prepare_all(&mut ctx).await {
            self.rollback(&mut ctx, &self.participants).await;
            return TransactionOutcome::failed(&ctx, ROLLED_BACK_MESSAGE);
        }
        ctx.set_phase(TransactionPhase::Prepared);

        // Phase 2: commit
        self.commit_all(&mut ctx).await;

        let failed = ctx.failed_backends();
        if failed.is_empty() {
            ctx.set_phase(TransactionPhase::Committed);
            info!(transaction_id = %ctx.id(), task_id = %task_id, "2PC transaction committed");
            return TransactionOutcome::succeeded(&ctx, COMMITTED_MESSAGE);
        }

        let committed = ctx.backends_with(&StepResult::Committed);
        let uncommitted: Vec<_> = self
            .participants
            .iter()
            .filter(|p| !committed.contains(&p.backend()))
            .cloned()
            .collect();
        self.rollback(&mut ctx, &uncommitted).await;

        if committed.is_empty() {
            return TransactionOutcome::failed(&ctx, ROLLED_BACK_MESSAGE);
        }

        error!(
            transaction_id = %ctx.id(),
            task_id = %task_id,
            committed = ?committed,
            failed = ?failed,
            "2PC partial commit: participants are inconsistent"
        );
        TransactionOutcome::inconsistent(
            &ctx,
            PARTIAL_COMMIT_MESSAGE,
            Inconsistency { committed, failed },
        )
    }

    /// Returns `false` on the first NO vote
    async fn prepare_all(&self, ctx: &mut TransactionContext) -> bool {
        ctx.set_phase(TransactionPhase::Preparing);
        let deadline = Instant::now() + self.config.phase_timeout;

        for participant in &self.participants {
            let backend = participant.backend();
            match guarded(deadline, participant.prepare(ctx)).await {
                Ok(()) => ctx.record(backend, StepResult::Prepared),
                Err(e) => {
                    warn!(
                        transaction_id = %ctx.id(),
                        backend = %backend,
                        error = %e,
                        "Participant voted NO in prepare phase"
                    );
                    ctx.record(backend, StepResult::Failed(e.to_string()));
                    return false;
                }
            }
        }
        true
    }

    /// Commits every participant; failures are recorded, not short-circuited
    async fn commit_all(&self, ctx: &mut TransactionContext) {
        ctx.set_phase(TransactionPhase::Committing);
        let deadline = Instant::now() + self.config.phase_timeout;

        for participant in &self.participants {
            let backend = participant.backend();
            match guarded(deadline, participant.commit(ctx)).await {
                Ok(()) => ctx.record(backend, StepResult::Committed),
                Err(e) => {
                    error!(
                        transaction_id = %ctx.id(),
                        backend = %backend,
                        error = %e,
                        "Commit failed"
                    );
                    ctx.record(backend, StepResult::Failed(e.to_string()));
                }
            }
        }
    }

    /// Roll back `participants` in reverse order, continuing past failures
    async fn rollback(
        &self,
        ctx: &mut TransactionContext,
        participants: &[Arc<dyn TwoPhaseParticipant>],
    ) {
        ctx.set_phase(TransactionPhase::RollingBack);
        info!(transaction_id = %ctx.id(), "Rolling back 2PC transaction");

        for participant in participants.iter().rev() {
            let backend = participant.backend();
            let had_handle = ctx.handle(backend).is_some();
            let deadline = Instant::now() + self.config.compensation_timeout;

            match guarded(deadline, participant.rollback(ctx)).await {
                Ok(()) if had_handle => ctx.record(backend, StepResult::RolledBack),
                Ok(()) => {}
                Err(e) => {
                    error!(
                        transaction_id = %ctx.id(),
                        backend = %backend,
                        error = %e,
                        "Rollback failed; continuing with remaining participants"
                    );
                }
            }
        }
        ctx.set_phase(TransactionPhase::RolledBack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Backend;
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::mocks::{CallLog, MockBehavior, MockParticipant};
    use crate::port::time_provider::FixedTimeProvider;
    use std::time::Duration;

    fn coordinator(mocks: Vec<MockParticipant>) -> TwoPhaseCommitCoordinator {
        let participants = mocks
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn TwoPhaseParticipant>)
            .collect();
        TwoPhaseCommitCoordinator::new(
            participants,
            Arc::new(SequentialIdProvider::new("tx")),
            Arc::new(FixedTimeProvider(1_000)),
            CoordinatorConfig {
                phase_timeout: Duration::from_millis(200),
                compensation_timeout: Duration::from_millis(100),
            },
        )
    }

    fn names() -> ServiceNames {
        ServiceNames::new(["postgres", "redis"])
    }

    #[tokio::test]
    async fn test_all_yes_commits_in_order() {
        let log = CallLog::new();
        let outcome = coordinator(MockParticipant::all(&log))
            .execute_transaction("t1", &names())
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message, COMMITTED_MESSAGE);
        assert_eq!(outcome.transaction_id, "tx-1");
        assert_eq!(log.backends_for("prepare"), Backend::ORDER.to_vec());
        assert_eq!(log.backends_for("commit"), Backend::ORDER.to_vec());
        assert!(log.backends_for("rollback").is_empty());
    }

    #[tokio::test]
    async fn test_prepare_failure_rolls_back_everyone_in_reverse() {
        for failing in Backend::ORDER {
            let log = CallLog::new();
            let mocks = MockParticipant::all(&log)
                .into_iter()
                .map(|m| {
                    if TwoPhaseParticipant::backend(&m) == failing {
                        m.fail_on("prepare")
                    } else {
                        m
                    }
                })
                .collect();

            let outcome = coordinator(mocks).execute_transaction("t1", &names()).await;

            assert!(!outcome.success);
            assert_eq!(outcome.message, ROLLED_BACK_MESSAGE);
            assert!(log.backends_for("commit").is_empty());

            let mut reversed = Backend::ORDER.to_vec();
            reversed.reverse();
            assert_eq!(log.backends_for("rollback"), reversed);

            // Stops at the first NO vote
            let prepared = log.backends_for("prepare");
            assert_eq!(prepared.last(), Some(&failing));
        }
    }

    #[tokio::test]
    async fn test_partial_commit_is_flagged() {
        let log = CallLog::new();
        let mocks = MockParticipant::all(&log)
            .into_iter()
            .map(|m| {
                if TwoPhaseParticipant::backend(&m) == Backend::DocumentStore {
                    m.fail_on("commit")
                } else {
                    m
                }
            })
            .collect();

        let outcome = coordinator(mocks).execute_transaction("t1", &names()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, PARTIAL_COMMIT_MESSAGE);
        let inconsistency = outcome.inconsistency.expect("inconsistency reported");
        assert_eq!(
            inconsistency.committed,
            vec![Backend::Store, Backend::Cache, Backend::Broker]
        );
        assert_eq!(inconsistency.failed, vec![Backend::DocumentStore]);

        // Only the participant that did not commit releases its staged state
        assert_eq!(log.backends_for("rollback"), vec![Backend::DocumentStore]);
    }

    #[tokio::test]
    async fn test_all_commits_failing_is_plain_failure() {
        let log = CallLog::new();
        let mocks = MockParticipant::all(&log)
            .into_iter()
            .map(|m| m.fail_on("commit"))
            .collect();

        let outcome = coordinator(mocks).execute_transaction("t1", &names()).await;

        assert!(!outcome.success);
        assert!(!outcome.is_inconsistent());
        assert_eq!(outcome.message, ROLLED_BACK_MESSAGE);
        assert_eq!(log.backends_for("rollback").len(), 4);
    }

    #[tokio::test]
    async fn test_hung_prepare_times_out_and_rolls_back() {
        let log = CallLog::new();
        let mocks = MockParticipant::all(&log)
            .into_iter()
            .map(|m| {
                if TwoPhaseParticipant::backend(&m) == Backend::Cache {
                    m.with("prepare", MockBehavior::Hang)
                } else {
                    m
                }
            })
            .collect();

        let outcome = coordinator(mocks).execute_transaction("t1", &names()).await;

        assert!(!outcome.success);
        assert_eq!(log.backends_for("rollback").len(), 4);
        assert!(log.backends_for("commit").is_empty());
    }

    #[tokio::test]
    async fn test_hung_rollback_does_not_block_the_rest() {
        let log = CallLog::new();
        let mocks = MockParticipant::all(&log)
            .into_iter()
            .map(|m| match TwoPhaseParticipant::backend(&m) {
                Backend::Broker => m.fail_on("prepare"),
                Backend::DocumentStore => m.with("rollback", MockBehavior::Hang),
                _ => m,
            })
            .collect();

        let outcome = coordinator(mocks).execute_transaction("t1", &names()).await;

        assert!(!outcome.success);
        assert_eq!(
            log.backends_for("rollback"),
            vec![
                Backend::Broker,
                Backend::DocumentStore,
                Backend::Cache,
                Backend::Store
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_participant_is_a_no_vote() {
        let log = CallLog::new();
        let mocks = MockParticipant::all(&log)
            .into_iter()
            .map(|m| {
                if TwoPhaseParticipant::backend(&m) == Backend::Store {
                    m.with("prepare", MockBehavior::Panic("boom".to_string()))
                } else {
                    m
                }
            })
            .collect();

        let outcome = coordinator(mocks).execute_transaction("t1", &names()).await;

        assert!(!outcome.success);
        assert_eq!(log.backends_for("prepare"), vec![Backend::Store]);
        assert_eq!(log.backends_for("rollback").len(), 4);
    }

    #[tokio::test]
    async fn test_participants_are_sorted_by_backend() {
        let log = CallLog::new();
        let mut mocks = MockParticipant::all(&log);
        mocks.reverse();

        coordinator(mocks).execute_transaction("t1", &names()).await;

        assert_eq!(log.backends_for("prepare"), Backend::ORDER.to_vec());
    }
}
