// TCC participants, one per backend

use crate::application::constants::{
    lock_key, status_key, CANCEL_ROUTING_KEY, EXCHANGE, ROUTING_KEY, STAGING_TTL, STATUS_TTL,
    TASK_LOG_COLLECTION,
};
use crate::application::task_record::{insert_tracked, load_row, owned_row, revert_row, row_handle};
use crate::domain::{
    Backend, BatchTask, StepHandle, TaskLogDocument, TaskMessage, TaskStatus, TransactionContext,
};
use crate::error::{AppError, Result};
use crate::port::{
    DocumentStore, KeyValueCache, MessageBroker, TaskStore, TccParticipant, TimeProvider,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn missing(backend: Backend) -> AppError {
    AppError::MissingHandle(backend.to_string())
}

/// Relational store: RESERVED row, confirmed to COMPLETED or set CANCELLED
pub struct StoreTccParticipant {
    store: Arc<dyn TaskStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl StoreTccParticipant {
    pub fn new(store: Arc<dyn TaskStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            store,
            time_provider,
        }
    }
}

#[async_trait]
impl TccParticipant for StoreTccParticipant {
    fn backend(&self) -> Backend {
        Backend::Store
    }

    async fn try_reserve(&self, ctx: &mut TransactionContext) -> Result<()> {
        let task = BatchTask::new(ctx.task_id(), ctx.service_names().clone(), ctx.started_at())
            .with_status(TaskStatus::Reserved);
        insert_tracked(self.store.as_ref(), ctx, &task, |existing: &BatchTask| {
            existing.status.is_negative_terminal()
        })
        .await?;
        Ok(())
    }

    async fn confirm(&self, ctx: &mut TransactionContext) -> Result<()> {
        let id = row_handle(ctx).ok_or_else(|| missing(Backend::Store))?;

        let mut task = load_row(self.store.as_ref(), id).await?;
        if task.is_completed() {
            return Ok(());
        }
        task.complete(self.time_provider.now_millis())?;
        self.store
            .update_status(id, task.status, task.completed_at)
            .await
    }

    async fn cancel(&self, ctx: &mut TransactionContext) -> Result<()> {
        let handle = ctx.take_handle(Backend::Store);
        let Some(id) = owned_row(self.store.as_ref(), ctx, handle, TaskStatus::Reserved).await?
        else {
            return Ok(());
        };

        if revert_row(self.store.as_ref(), id, TaskStatus::Cancelled).await? {
            debug!(transaction_id = %ctx.id(), row_id = id, "Store reservation cancelled");
        }
        Ok(())
    }
}

/// Cache: set-if-absent lock on the task id guarding a RESERVED status key
pub struct CacheTccParticipant {
    cache: Arc<dyn KeyValueCache>,
}

impl CacheTccParticipant {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }

    /// Whether another transaction holds the lock
    async fn held_by_other(&self, lock_key: &str, owner: &str) -> Result<bool> {
        match self.cache.get(lock_key).await? {
            Some(holder) if holder != owner => {
                warn!(lock_key = %lock_key, holder = %holder, "Lock held by another transaction");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Delete the lock only while this transaction still owns it
    async fn release_lock(&self, lock_key: &str, owner: &str) -> Result<()> {
        if let Some(holder) = self.cache.get(lock_key).await? {
            if holder == owner {
                self.cache.delete(lock_key).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TccParticipant for CacheTccParticipant {
    fn backend(&self) -> Backend {
        Backend::Cache
    }

    async fn try_reserve(&self, ctx: &mut TransactionContext) -> Result<()> {
        let lock_key = lock_key(ctx.task_id());
        let status_key = status_key(ctx.task_id());

        // Tracked before the lock request: if the reply is lost, cancel still
        // finds the lock and releases it when this transaction is the holder
        ctx.put_handle(
            Backend::Cache,
            StepHandle::CacheReservation {
                status_key: status_key.clone(),
                lock_key: lock_key.clone(),
            },
        );

        let acquired = self
            .cache
            .set_if_absent(&lock_key, ctx.id(), STAGING_TTL)
            .await?;
        if !acquired {
            ctx.take_handle(Backend::Cache);
            return Err(AppError::LockHeld(ctx.task_id().to_string()));
        }

        self.cache
            .set(&status_key, TaskStatus::Reserved.as_str(), STAGING_TTL)
            .await
    }

    async fn confirm(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::CacheReservation {
            status_key,
            lock_key,
        }) = ctx.handle(Backend::Cache).cloned()
        else {
            return Err(missing(Backend::Cache));
        };

        self.cache
            .set(&status_key, TaskStatus::Completed.as_str(), STATUS_TTL)
            .await?;
        self.release_lock(&lock_key, ctx.id()).await
    }

    async fn cancel(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::CacheReservation {
            status_key,
            lock_key,
        }) = ctx.take_handle(Backend::Cache)
        else {
            return Ok(());
        };

        // The status key belongs to whoever holds the lock
        if self.held_by_other(&lock_key, ctx.id()).await? {
            return Ok(());
        }
        self.cache.delete(&status_key).await?;
        self.release_lock(&lock_key, ctx.id()).await
    }
}

/// Document store: RESERVED task log, updated in place on confirm
pub struct DocumentTccParticipant {
    documents: Arc<dyn DocumentStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DocumentTccParticipant {
    pub fn new(documents: Arc<dyn DocumentStore>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            documents,
            time_provider,
        }
    }
}

#[async_trait]
impl TccParticipant for DocumentTccParticipant {
    fn backend(&self) -> Backend {
        Backend::DocumentStore
    }

    async fn try_reserve(&self, ctx: &mut TransactionContext) -> Result<()> {
        let mut doc = TaskLogDocument::new(
            ctx.task_id(),
            ctx.service_names(),
            TaskStatus::Reserved,
            ctx.started_at(),
        );
        doc.transaction_id = Some(ctx.id().to_string());

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

    async fn confirm(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::Document { collection, id }) = ctx.handle(Backend::DocumentStore)
        else {
            return Err(missing(Backend::DocumentStore));
        };

        let fields = json!({
            "status": TaskStatus::Completed,
            "completedAt": self.time_provider.now_millis(),
        });
        if !self.documents.update_by_id(collection, id, fields).await? {
            return Err(AppError::NotFound(format!("document {} in {}", id, collection)));
        }
        Ok(())
    }

    async fn cancel(&self, ctx: &mut TransactionContext) -> Result<()> {
        if let Some(StepHandle::Document { collection, id }) =
            ctx.take_handle(Backend::DocumentStore)
        {
            self.documents.remove_by_id(&collection, &id).await?;
        }
        Ok(())
    }
}

/// Broker: message staged on try, published on confirm
///
/// A published message cannot be retracted; cancelling after confirm sends a
/// cancellation notice instead.
pub struct BrokerTccParticipant {
    broker: Arc<dyn MessageBroker>,
}

impl BrokerTccParticipant {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl TccParticipant for BrokerTccParticipant {
    fn backend(&self) -> Backend {
        Backend::Broker
    }

    async fn try_reserve(&self, ctx: &mut TransactionContext) -> Result<()> {
        let message = TaskMessage::new(ctx.task_id(), ctx.service_names(), TaskStatus::Reserved);
        ctx.put_handle(
            Backend::Broker,
            StepHandle::Message {
                message,
                published: false,
            },
        );
        Ok(())
    }

    async fn confirm(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::Message { message, published }) = ctx.handle_mut(Backend::Broker)
        else {
            return Err(missing(Backend::Broker));
        };
        if *published {
            return Ok(());
        }

        let payload = message.with_status(TaskStatus::Completed).to_payload()?;
        self.broker.publish(EXCHANGE, ROUTING_KEY, &payload).await?;
        *published = true;
        Ok(())
    }

    async fn cancel(&self, ctx: &mut TransactionContext) -> Result<()> {
        let Some(StepHandle::Message { message, published }) = ctx.take_handle(Backend::Broker)
        else {
            return Ok(());
        };
        if !published {
            return Ok(());
        }

        let payload = message.with_status(TaskStatus::Cancelled).to_payload()?;
        self.broker
            .publish(EXCHANGE, CANCEL_ROUTING_KEY, &payload)
            .await?;
        info!(
            transaction_id = %ctx.id(),
            task_id = %message.task_id,
            "Published cancellation notice"
        );
        Ok(())
    }
}
