// Application Layer - Coordinators, participants and the batch task service

pub mod batch_task;
pub mod config;
pub mod constants;
pub mod guard;
pub mod outcome;
pub mod saga;
mod task_record;
pub mod tcc;
pub mod two_phase;

// Re-exports
pub use batch_task::{BatchTaskRequest, BatchTaskService, Backends};
pub use config::CoordinatorConfig;
pub use outcome::{Inconsistency, TransactionOutcome};
pub use saga::SagaOrchestrator;
pub use tcc::TccCoordinator;
pub use two_phase::TwoPhaseCommitCoordinator;
