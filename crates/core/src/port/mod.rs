// Port Layer - Interfaces for external dependencies

pub mod cache;
pub mod document_store;
pub mod id_provider; // For deterministic testing
pub mod message_broker;
#[cfg(test)]
pub mod mocks;
pub mod participant;
pub mod task_store;
pub mod time_provider;

// Re-exports
pub use cache::KeyValueCache;
pub use document_store::{DocumentId, DocumentStore};
pub use id_provider::IdProvider;
pub use message_broker::MessageBroker;
pub use participant::{SagaStep, TccParticipant, TwoPhaseParticipant};
pub use task_store::TaskStore;
pub use time_provider::TimeProvider;
