// Healthcheck Infrastructure - In-process backends
// Implements: KeyValueCache, DocumentStore, MessageBroker
//
// Stand-ins for the external cache, document store and broker. Each backend
// carries a `FaultInjector` so tests and local runs can force individual
// operations to fail.

mod broker;
mod cache;
mod document_store;
mod fault;

pub use broker::{InMemoryMessageBroker, PublishedMessage};
pub use cache::InMemoryCache;
pub use document_store::{InMemoryDocumentStore, ID_FIELD};
pub use fault::FaultInjector;
