// Saga steps, one per backend

use crate::application::constants::{
    status_key, CANCEL_ROUTING_KEY, EXCHANGE, ROUTING_KEY, STATUS_TTL, TASK_LOG_COLLECTION,
};
use crate::application::task_record::{insert_reclaiming, revert_row};
use crate::domain::{
    Backend, BatchTask, StepHandle, TaskLogDocument, TaskMessage, TaskStatus, TransactionContext,
};
use crate::error::Result;
use crate::port::{
    DocumentStore, KeyValueCache, MessageBroker, SagaStep, TaskStore, TimeProvider,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Relational store: COMPLETED row, compensated to FAILED
pub struct StoreSagaStep {
    store: Arc<dyn TaskStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl StoreSagaStep {
    pub fn new(store: Arc<dyn TaskStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            store,
            time_provider,
        }
    }
}

#[async_trait]
impl SagaStep for StoreSagaStep {
    fn backend(&self) -> Backend {
        Backend::Store
    }

    fn name(&self) -> &'static str {
        "create_task_record"
    }

    async fn execute(&self, ctx: &mut TransactionContext) -> Result<()> {
        let mut task = BatchTask::new(ctx.task_id(), ctx.service_names().clone(), ctx.started_at());
        task.complete(self.time_provider.now_millis())?;

        let id = insert_reclaiming(self.store.as_ref(), &task, |existing: &BatchTask| {
            existing.status.is_negative_terminal()
        })
        .await?;
        ctx.put_handle(Backend::Store, StepHandle::Row(id));
        Ok(())
    }

    async fn compensate(&self, ctx: &mut TransactionContext) -> Result<()> {
        if let Some(StepHandle::Row(id)) = ctx.take_handle(Backend::Store) {
            revert_row(self.store.as_ref(), id, TaskStatus::Failed).await?;
        }
        Ok(())
    }
}

/// Cache: task status key, deleted on compensation
pub struct CacheSagaStep {
    cache: Arc<dyn KeyValueCache>,
}

impl CacheSagaStep {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl SagaStep for CacheSagaStep {
    fn backend(&self) -> Backend {
        Backend::Cache
    }

    fn name(&self) -> &'static str {
        "cache_task_status"
    }

    async fn execute(&self, ctx: &mut TransactionContext) -> Result<()> {
        let key = status_key(ctx.task_id());
        self.cache
            .set(&key, TaskStatus::Completed.as_str(), STATUS_TTL)
            .await?;
        ctx.put_handle(Backend::Cache, StepHandle::CacheKey(key));
        Ok(())
    }

    async fn compensate(&self, ctx: &mut TransactionContext) -> Result<()> {
        if let Some(StepHandle::CacheKey(key)) = ctx.take_handle(Backend::Cache) {
            self.cache.delete(&key).await?;
        }
        Ok(())
    }
}

/// Document store: COMPLETED task log tagged with the saga id
pub struct DocumentSagaStep {
    documents: Arc<dyn DocumentStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DocumentSagaStep {
    pub fn new(documents: Arc<dyn DocumentStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            documents,
            time_provider,
        }
    }
}

#[async_trait]
impl SagaStep for DocumentSagaStep {
    fn backend(&self) -> Backend {
        Backend::DocumentStore
    }

    fn name(&self) -> &'static str {
        "write_task_log"
    }

    async fn execute(&self, ctx: &mut TransactionContext) -> Result<()> {
        let mut doc = TaskLogDocument::new(
            ctx.task_id(),
            ctx.service_names(),
            TaskStatus::Completed,
            ctx.started_at(),
        );
        doc.saga_id = Some(ctx.id().to_string());
        doc.completed_at = Some(self.time_provider.now_millis());

        let id = self
            .documents
            .insert(TASK_LOG_COLLECTION, doc.to_value()?)
            .await?;
        ctx.put_handle(
            Backend::DocumentStore,
            StepHandle::Document {
                collection: TASK_LOG_COLLECTION.to_string(),
                id,
            },
        );
        Ok(())
    }

    async fn compensate(&self, ctx: &mut TransactionContext) -> Result<()> {
        if let Some(StepHandle::Document { collection, id }) =
            ctx.take_handle(Backend::DocumentStore)
        {
            self.documents.remove_by_id(&collection, &id).await?;
        }
        Ok(())
    }
}

/// Broker: COMPLETED notification, compensated by a cancellation notice
pub struct BrokerSagaStep {
    broker: Arc<dyn MessageBroker>,
}

impl BrokerSagaStep {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl SagaStep for BrokerSagaStep {
    fn backend(&self) -> Backend {
        Backend::Broker
    }

    fn name(&self) -> &'static str {
        "publish_task_event"
    }

    async fn execute(&self, ctx: &mut TransactionContext) -> Result<()> {
        let message = TaskMessage::new(ctx.task_id(), ctx.service_names(), TaskStatus::Completed);
        self.broker
            .publish(EXCHANGE, ROUTING_KEY, &message.to_payload()?)
            .await?;

        ctx.put_handle(
            Backend::Broker,
            StepHandle::Message {
                message,
                published: true,
            },
        );
        Ok(())
    }

    async fn compensate(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::Message { message, .. }) = ctx.take_handle(Backend::Broker) else {
            return Ok(());
        };

        let payload = message.with_status(TaskStatus::Cancelled).to_payload()?;
        self.broker
            .publish(EXCHANGE, CANCEL_ROUTING_KEY, &payload)
            .await?;
        info!(saga_id = %ctx.id(), task_id = %message.task_id, "Published cancellation notice");
        Ok(())
    }
}
