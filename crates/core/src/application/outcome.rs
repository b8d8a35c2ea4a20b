// Coordinator outcome

use crate::domain::{Backend, Protocol, TransactionContext};
use serde::Serialize;

/// Participants that disagree after a 2PC commit phase partially failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    /// Durably committed, cannot be rolled back
    pub committed: Vec<Backend>,
    /// Did not commit
    pub failed: Vec<Backend>,
}

/// Result of one coordinator run
///
/// `success` is the only signal callers act on; `message` is for response
/// shaping. `inconsistency` is set only for the fatal 2PC partial-commit case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub transaction_id: String,
    pub task_id: String,
    pub pattern: Protocol,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inconsistency: Option<Inconsistency>,
}

impl TransactionOutcome {
    pub fn succeeded(ctx: &TransactionContext, message: impl Into<String>) -> Self {
        Self::from_context(ctx, true, message.into(), None)
    }

    pub fn failed(ctx: &TransactionContext, message: impl Into<String>) -> Self {
        Self::from_context(ctx, false, message.into(), None)
    }

    pub fn inconsistent(
        ctx: &TransactionContext,
        message: impl Into<String>,
        inconsistency: Inconsistency,
    ) -> Self {
        Self::from_context(ctx, false, message.into(), Some(inconsistency))
    }

    fn from_context(
        ctx: &TransactionContext,
        success: bool,
        message: String,
        inconsistency: Option<Inconsistency>,
    ) -> Self {
        Self {
            transaction_id: ctx.id().to_string(),
            task_id: ctx.task_id().to_string(),
            pattern: ctx.protocol(),
            success,
            message,
            inconsistency,
        }
    }

    pub fn is_inconsistent(&self) -> bool {
        self.inconsistency.is_some()
    }
}
