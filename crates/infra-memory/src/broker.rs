// In-memory MessageBroker that records what was published

use crate::fault::FaultInjector;
use async_trait::async_trait;
use healthcheck_core::error::Result;
use healthcheck_core::port::MessageBroker;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: String,
}

impl PublishedMessage {
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.payload)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMessageBroker {
    published: Mutex<Vec<PublishedMessage>>,
    faults: FaultInjector,
}

impl InMemoryMessageBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault switches (`publish`)
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Every accepted message, in publish order
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    pub fn published_to(&self, routing_key: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .iter()
            .filter(|m| m.routing_key == routing_key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageBroker for InMemoryMessageBroker {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &str) -> Result<()> {
        self.faults.check("publish")?;

        debug!(exchange = %exchange, routing_key = %routing_key, "Published message");
        self.published.lock().push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}
