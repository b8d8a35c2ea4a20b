//! Shared wiring for integration tests: SQLite store plus in-process backends

#![allow(dead_code)]

use healthcheck_core::application::constants::{
    lock_key, status_key, PREPARE_KEY_PREFIX, TASK_LOG_COLLECTION, TASK_LOG_PREPARE_COLLECTION,
};
use healthcheck_core::application::{
    Backends, BatchTaskRequest, BatchTaskService, CoordinatorConfig,
};
use async_trait::async_trait;
use healthcheck_core::domain::{BatchTask, RowId, TaskStatus};
use healthcheck_core::port::id_provider::UuidProvider;
use healthcheck_core::port::time_provider::SystemTimeProvider;
use healthcheck_core::port::{KeyValueCache, TaskStore};
use healthcheck_core::Result;
use healthcheck_infra_memory::{InMemoryCache, InMemoryDocumentStore, InMemoryMessageBroker};
use healthcheck_infra_sqlite::{create_pool, run_migrations, SqliteTaskStore};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct Harness {
    pub service: Arc<BatchTaskService>,
    pub store: Arc<SqliteTaskStore>,
    pub cache: Arc<InMemoryCache>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub broker: Arc<InMemoryMessageBroker>,
    /// Delays on the store the service writes through
    pub store_stalls: Arc<StallingStore>,
    /// Delays on the cache the service writes through
    pub cache_stalls: Arc<StallingCache>,
}

/// One-shot delay, consumed by the first call that sees it
#[derive(Default)]
pub struct Stall(Mutex<Option<Duration>>);

impl Stall {
    pub fn arm(&self, delay: Duration) {
        *self.0.lock().unwrap() = Some(delay);
    }

    async fn wait(&self) {
        let delay = self.0.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Task store that can hold a call open before or after it takes effect
pub struct StallingStore {
    inner: Arc<SqliteTaskStore>,
    /// Applied after an insert has been written
    pub after_insert: Stall,
    /// Applied before a status update is written
    pub before_update: Stall,
}

#[async_trait]
impl TaskStore for StallingStore {
    async fn insert(&self, task: &BatchTask) -> Result<RowId> {
        let id = self.inner.insert(task).await?;
        self.after_insert.wait().await;
        Ok(id)
    }

    async fn update_status(
        &self,
        id: RowId,
        status: TaskStatus,
        completed_at: Option<i64>,
    ) -> Result<()> {
        self.before_update.wait().await;
        self.inner.update_status(id, status, completed_at).await
    }

    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<BatchTask>> {
        self.inner.find_by_task_id(task_id).await
    }

    async fn find_by_id(&self, id: RowId) -> Result<Option<BatchTask>> {
        self.inner.find_by_id(id).await
    }

    async fn delete(&self, id: RowId) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// Cache that can hold a lock acquisition open after it took the lock
pub struct StallingCache {
    inner: Arc<InMemoryCache>,
    pub after_lock: Stall,
}

#[async_trait]
impl KeyValueCache for StallingCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let written = self.inner.set_if_absent(key, value, ttl).await?;
        self.after_lock.wait().await;
        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }
}

pub async fn harness() -> Harness {
    harness_with(CoordinatorConfig {
        phase_timeout: Duration::from_secs(2),
        compensation_timeout: Duration::from_secs(1),
    })
    .await
}

pub async fn harness_with(config: CoordinatorConfig) -> Harness {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let store = Arc::new(SqliteTaskStore::new(pool));
    let cache = Arc::new(InMemoryCache::new());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let broker = Arc::new(InMemoryMessageBroker::new());
    let store_stalls = Arc::new(StallingStore {
        inner: store.clone(),
        after_insert: Stall::default(),
        before_update: Stall::default(),
    });
    let cache_stalls = Arc::new(StallingCache {
        inner: cache.clone(),
        after_lock: Stall::default(),
    });

    let backends = Backends {
        store: store_stalls.clone(),
        cache: cache_stalls.clone(),
        documents: documents.clone(),
        broker: broker.clone(),
    };
    let service = Arc::new(BatchTaskService::from_backends(
        backends,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        config,
    ));

    Harness {
        service,
        store,
        cache,
        documents,
        broker,
        store_stalls,
        cache_stalls,
    }
}

pub fn request(task_id: &str) -> BatchTaskRequest {
    BatchTaskRequest::new(task_id, ["postgres", "redis"])
}

impl Harness {
    pub async fn record(&self, task_id: &str) -> Option<BatchTask> {
        self.store.find_by_task_id(task_id).await.unwrap()
    }

    pub fn cached_status(&self, task_id: &str) -> Option<String> {
        self.cache.peek(&status_key(task_id))
    }

    pub fn lock_holder(&self, task_id: &str) -> Option<String> {
        self.cache.peek(&lock_key(task_id))
    }

    pub fn staging_keys(&self) -> Vec<String> {
        self.cache.keys_with_prefix(PREPARE_KEY_PREFIX)
    }

    pub fn task_logs(&self, task_id: &str) -> Vec<Value> {
        self.documents
            .find_by_field(TASK_LOG_COLLECTION, "taskId", task_id)
    }

    pub fn staged_logs(&self, task_id: &str) -> Vec<Value> {
        self.documents
            .find_by_field(TASK_LOG_PREPARE_COLLECTION, "taskId", task_id)
    }

    /// Statuses of published messages on `routing_key`
    pub fn published_statuses(&self, routing_key: &str) -> Vec<String> {
        self.broker
            .published_to(routing_key)
            .iter()
            .map(|m| m.json().unwrap()["status"].as_str().unwrap().to_string())
            .collect()
    }
}
