// ============================================================================
// Mock Participants for Testing
// ============================================================================
//
// One recording participant that implements all three protocol contracts.
// Every call is appended to a shared `CallLog`, so tests can assert ordering
// across participants.

use crate::domain::{Backend, StepHandle, TransactionContext};
use crate::error::{AppError, Result};
use crate::port::{SagaStep, TccParticipant, TwoPhaseParticipant};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock participant behavior for one operation
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Succeed
    Succeed,
    /// Return an error with message
    Fail(String),
    /// Never complete (for deadline testing)
    Hang,
    /// Panic with message (for panic isolation testing)
    Panic(String),
}

/// One recorded participant call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub backend: Backend,
    pub op: &'static str,
    /// Whether a compensation handle was present when the call started
    pub had_handle: bool,
}

/// Shared, ordered log of calls across participants
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// `(backend, op)` pairs in call order
    pub fn sequence(&self) -> Vec<(Backend, &'static str)> {
        self.calls().into_iter().map(|c| (c.backend, c.op)).collect()
    }

    /// Backends that received `op`, in call order
    pub fn backends_for(&self, op: &str) -> Vec<Backend> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == op)
            .map(|c| c.backend)
            .collect()
    }
}

/// Recording participant with per-operation behavior
pub struct MockParticipant {
    backend: Backend,
    log: CallLog,
    behaviors: HashMap<&'static str, MockBehavior>,
}

impl MockParticipant {
    pub fn new(backend: Backend, log: CallLog) -> Self {
        Self {
            backend,
            log,
            behaviors: HashMap::new(),
        }
    }

    /// Override the behavior of one operation (`"prepare"`, `"confirm"`, ...)
    pub fn with(mut self, op: &'static str, behavior: MockBehavior) -> Self {
        self.behaviors.insert(op, behavior);
        self
    }

    pub fn fail_on(self, op: &'static str) -> Self {
        let msg = format!("{} injected failure", op);
        self.with(op, MockBehavior::Fail(msg))
    }

    /// One mock per backend, in forward order, sharing `log`
    pub fn all(log: &CallLog) -> Vec<MockParticipant> {
        Backend::ORDER
            .into_iter()
            .map(|b| MockParticipant::new(b, log.clone()))
            .collect()
    }

    async fn run(&self, op: &'static str, ctx: &TransactionContext) -> Result<()> {
        self.log.push(Call {
            backend: self.backend,
            op,
            had_handle: ctx.handle(self.backend).is_some(),
        });

        match self.behaviors.get(op).cloned().unwrap_or(MockBehavior::Succeed) {
            MockBehavior::Succeed => Ok(()),
            MockBehavior::Fail(msg) => Err(AppError::Backend(msg)),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            MockBehavior::Panic(msg) => {
                panic!("{}", msg); // Actually panic for panic isolation testing
            }
        }
    }

    async fn forward(&self, op: &'static str, ctx: &mut TransactionContext) -> Result<()> {
        self.run(op, ctx).await?;
        let handle = StepHandle::CacheKey(format!("{}:{}", self.backend, ctx.id()));
        ctx.put_handle(self.backend, handle);
        Ok(())
    }

    async fn finish(
        &self,
        op: &'static str,
        ctx: &mut TransactionContext,
        consume: bool,
    ) -> Result<()> {
        self.run(op, ctx).await?;
        if ctx.handle(self.backend).is_none() {
            return Err(AppError::MissingHandle(self.backend.to_string()));
        }
        if consume {
            ctx.take_handle(self.backend);
        }
        Ok(())
    }

    async fn undo(&self, op: &'static str, ctx: &mut TransactionContext) -> Result<()> {
        self.run(op, ctx).await?;
        ctx.take_handle(self.backend);
        Ok(())
    }
}

#[async_trait]
impl TwoPhaseParticipant for MockParticipant {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn prepare(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.forward("prepare", ctx).await
    }

    async fn commit(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.finish("commit", ctx, true).await
    }

    async fn rollback(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.undo("rollback", ctx).await
    }
}

#[async_trait]
impl TccParticipant for MockParticipant {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn try_reserve(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.forward("try", ctx).await
    }

    async fn confirm(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.finish("confirm", ctx, false).await
    }

    async fn cancel(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.undo("cancel", ctx).await
    }
}

#[async_trait]
impl SagaStep for MockParticipant {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn execute(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.forward("execute", ctx).await
    }

    async fn compensate(&self, ctx: &mut TransactionContext) -> Result<()> {
        self.undo("compensate", ctx).await
    }
}
