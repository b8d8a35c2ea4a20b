// 2PC participants, one per backend

use crate::application::constants::{
    prepare_key, status_key, EXCHANGE, ROUTING_KEY, STAGING_TTL, STATUS_TTL,
    TASK_LOG_COLLECTION, TASK_LOG_PREPARE_COLLECTION,
};
use crate::application::task_record::{insert_tracked, load_row, owned_row, row_handle};
use crate::domain::{
    Backend, BatchTask, StepHandle, TaskLogDocument, TaskMessage, TaskStatus, TransactionContext,
};
use crate::error::{AppError, Result};
use crate::port::{
    DocumentStore, KeyValueCache, MessageBroker, TaskStore, TimeProvider, TwoPhaseParticipant,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

fn missing(backend: Backend) -> AppError {
    AppError::MissingHandle(backend.to_string())
}

/// Relational store: PREPARED row, promoted to COMPLETED on commit
///
/// A PREPARED row left by another run is only reclaimed once it is older
/// than `abandon_after`; until then it belongs to a live run and prepare
/// votes NO.
pub struct StoreTwoPhaseParticipant {
    store: Arc<dyn TaskStore>,
    time_provider: Arc<dyn TimeProvider>,
    abandon_after: Duration,
}

impl StoreTwoPhaseParticipant {
    pub fn new(
        store: Arc<dyn TaskStore>,
        time_provider: Arc<dyn TimeProvider>,
        abandon_after: Duration,
    ) -> Self {
        Self {
            store,
            time_provider,
            abandon_after,
        }
    }
}

#[async_trait]
impl TwoPhaseParticipant for StoreTwoPhaseParticipant {
    fn backend(&self) -> Backend {
        Backend::Store
    }

    async fn prepare(&self, ctx: &mut TransactionContext) -> Result<()> {
        let task = BatchTask::new(ctx.task_id(), ctx.service_names().clone(), ctx.started_at())
            .with_status(TaskStatus::Prepared);
        let abandoned_before = ctx.started_at() - self.abandon_after.as_millis() as i64;
        let reclaimable = move |existing: &BatchTask| {
            existing.status.is_negative_terminal()
                || (existing.status == TaskStatus::Prepared
                    && existing.created_at < abandoned_before)
        };
        let id = insert_tracked(self.store.as_ref(), ctx, &task, reclaimable).await?;

        debug!(transaction_id = %ctx.id(), row_id = id, "Store prepared");
        Ok(())
    }

    async fn commit(&self, ctx: &mut TransactionContext) -> Result<()> {
        let id = row_handle(ctx).ok_or_else(|| missing(Backend::Store))?;

        let mut task = load_row(self.store.as_ref(), id).await?;
        task.complete(self.time_provider.now_millis())?;
        self.store
            .update_status(id, task.status, task.completed_at)
            .await?;

        ctx.take_handle(Backend::Store);
        Ok(())
    }

    async fn rollback(&self, ctx: &mut TransactionContext) -> Result<()> {
        let handle = ctx.take_handle(Backend::Store);
        let Some(id) = owned_row(self.store.as_ref(), ctx, handle, TaskStatus::Prepared).await?
        else {
            return Ok(());
        };

        // Only a row that is still tentative is ours to discard
        if let Some(task) = self.store.find_by_id(id).await? {
            if task.status == TaskStatus::Prepared {
                self.store.delete(id).await?;
            }
        }
        Ok(())
    }
}

/// Cache: staging key per transaction, promoted to the task status key
pub struct CacheTwoPhaseParticipant {
    cache: Arc<dyn KeyValueCache>,
}

impl CacheTwoPhaseParticipant {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl TwoPhaseParticipant for CacheTwoPhaseParticipant {
    fn backend(&self) -> Backend {
        Backend::Cache
    }

    async fn prepare(&self, ctx: &mut TransactionContext) -> Result<()> {
        let staging_key = prepare_key(ctx.id());

        // Tracked before the write so rollback covers an unacknowledged set
        let handle = StepHandle::StagedCacheKey {
            staging_key: staging_key.clone(),
            status_key: status_key(ctx.task_id()),
        };
        ctx.put_handle(Backend::Cache, handle);

        self.cache
            .set(&staging_key, TaskStatus::Processing.as_str(), STAGING_TTL)
            .await
    }

    async fn commit(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::StagedCacheKey {
            staging_key,
            status_key,
        }) = ctx.handle(Backend::Cache).cloned()
        else {
            return Err(missing(Backend::Cache));
        };

        if self.cache.get(&staging_key).await?.is_none() {
            return Err(AppError::InvalidState(format!(
                "staging key {} expired before commit",
                staging_key
            )));
        }

        self.cache
            .set(&status_key, TaskStatus::Completed.as_str(), STATUS_TTL)
            .await?;
        self.cache.delete(&staging_key).await?;

        ctx.take_handle(Backend::Cache);
        Ok(())
    }

    async fn rollback(&self, ctx: &mut TransactionContext) -> Result<()> {
        if let Some(StepHandle::StagedCacheKey { staging_key, .. }) =
            ctx.take_handle(Backend::Cache)
        {
            self.cache.delete(&staging_key).await?;
        }
        Ok(())
    }
}

/// Document store: staged document moved to the task log on commit
pub struct DocumentTwoPhaseParticipant {
    documents: Arc<dyn DocumentStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DocumentTwoPhaseParticipant {
    pub fn new(documents: Arc<dyn DocumentStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            documents,
            time_provider,
        }
    }
}

#[async_trait]
impl TwoPhaseParticipant for DocumentTwoPhaseParticipant {
    fn backend(&self) -> Backend {
        Backend::DocumentStore
    }

    async fn prepare(&self, ctx: &mut TransactionContext) -> Result<()> {
        let mut doc = TaskLogDocument::new(
            ctx.task_id(),
            ctx.service_names(),
            TaskStatus::Processing,
            ctx.started_at(),
        );
        doc.transaction_id = Some(ctx.id().to_string());

        let document = doc.to_value()?;
        let id = self
            .documents
            .insert(TASK_LOG_PREPARE_COLLECTION, document.clone())
            .await?;

        let handle = StepHandle::StagedDocument {
            collection: TASK_LOG_PREPARE_COLLECTION.to_string(),
            id,
            document,
        };
        ctx.put_handle(Backend::DocumentStore, handle);
        Ok(())
    }

    async fn commit(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::StagedDocument {
            collection,
            id,
            document,
        }) = ctx.handle(Backend::DocumentStore).cloned()
        else {
            return Err(missing(Backend::DocumentStore));
        };

        let mut doc: TaskLogDocument = serde_json::from_value(document)?;
        doc.status = TaskStatus::Completed;
        doc.completed_at = Some(self.time_provider.now_millis());

        self.documents
            .insert(TASK_LOG_COLLECTION, doc.to_value()?)
            .await?;
        self.documents.remove_by_id(&collection, &id).await?;

        ctx.take_handle(Backend::DocumentStore);
        Ok(())
    }

    async fn rollback(&self, ctx: &mut TransactionContext) -> Result<()> {
        if let Some(StepHandle::StagedDocument { collection, id, .. }) =
            ctx.take_handle(Backend::DocumentStore)
        {
            self.documents.remove_by_id(&collection, &id).await?;
        }
        Ok(())
    }
}

/// Broker: message buffered in the context, published on commit
pub struct BrokerTwoPhaseParticipant {
    broker: Arc<dyn MessageBroker>,
}

impl BrokerTwoPhaseParticipant {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl TwoPhaseParticipant for BrokerTwoPhaseParticipant {
    fn backend(&self) -> Backend {
        Backend::Broker
    }

    async fn prepare(&self, ctx: &mut TransactionContext) -> Result<()> {
        let message = TaskMessage::new(ctx.task_id(), ctx.service_names(), TaskStatus::Processing);
        ctx.put_handle(
            Backend::Broker,
            StepHandle::Message {
                message,
                published: false,
            },
        );
        Ok(())
    }

    async fn commit(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::Message { message, .. }) = ctx.handle(Backend::Broker) else {
            return Err(missing(Backend::Broker));
        };

        let payload = message.with_status(TaskStatus::Completed).to_payload()?;
        self.broker.publish(EXCHANGE, ROUTING_KEY, &payload).await?;

        ctx.take_handle(Backend::Broker);
        Ok(())
    }

    async fn rollback(&self, ctx: &mut TransactionContext) -> Result<()> {
        if ctx.take_handle(Backend::Broker).is_some() {
            debug!(transaction_id = %ctx.id(), "Dropped staged broker message");
        }
        Ok(())
    }
}
