// Domain Layer - Task record, protocol context and backend tags

pub mod backend;
pub mod context;
pub mod error;
pub mod message;
pub mod task;

// Re-exports
pub use backend::{Backend, Protocol};
pub use context::{StepHandle, StepResult, TransactionContext, TransactionId, TransactionPhase};
pub use error::DomainError;
pub use message::{TaskLogDocument, TaskMessage};
pub use task::{BatchTask, RowId, ServiceNames, TaskId, TaskStatus};
