// Participant Contracts
//
// One capability interface per protocol. Each is implemented once per backend
// (store, cache, document store, broker). Implementations are stateless with
// respect to transaction identity: everything a later call needs goes into the
// `TransactionContext`.

use crate::domain::{Backend, TransactionContext};
use crate::error::Result;
use async_trait::async_trait;

/// Two-Phase Commit participant
///
/// `Err` from `prepare` is a vote NO. `rollback` must be a no-op when the
/// participant never prepared (or already committed) in this context.
#[async_trait]
pub trait TwoPhaseParticipant: Send + Sync {
    fn backend(&self) -> Backend;

    /// Make tentative state durable without exposing it as final
    async fn prepare(&self, ctx: &mut TransactionContext) -> Result<()>;

    /// Promote prepared state to final state
    async fn commit(&self, ctx: &mut TransactionContext) -> Result<()>;

    /// Discard prepared state
    async fn rollback(&self, ctx: &mut TransactionContext) -> Result<()>;
}

/// Try-Confirm-Cancel participant
///
/// `confirm` and `cancel` must be safe without a prior successful
/// `try_reserve` in this context.
#[async_trait]
pub trait TccParticipant: Send + Sync {
    fn backend(&self) -> Backend;

    /// Reserve the resource without committing
    async fn try_reserve(&self, ctx: &mut TransactionContext) -> Result<()>;

    /// Finalize the reservation
    async fn confirm(&self, ctx: &mut TransactionContext) -> Result<()>;

    /// Release the reservation (or revert a confirmation)
    async fn cancel(&self, ctx: &mut TransactionContext) -> Result<()>;
}

/// Saga step: an immediate local commit plus its semantic undo
#[async_trait]
pub trait SagaStep: Send + Sync {
    fn backend(&self) -> Backend;

    /// Human-readable step name for logs
    fn name(&self) -> &'static str {
        self.backend().as_str()
    }

    /// Commit locally and leave a compensation handle in the context
    async fn execute(&self, ctx: &mut TransactionContext) -> Result<()>;

    /// Undo `execute`; a no-op when no handle is present
    async fn compensate(&self, ctx: &mut TransactionContext) -> Result<()>;
}
