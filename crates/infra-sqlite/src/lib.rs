// Healthcheck Infrastructure - SQLite Adapter
// Implements: TaskStore (relational store backend)

mod connection;
mod migration;
mod task_store;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use task_store::SqliteTaskStore;
