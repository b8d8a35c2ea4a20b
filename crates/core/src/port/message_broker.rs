// Message Broker Port

use crate::error::Result;
use async_trait::async_trait;

/// Fire-and-forget publisher
///
/// A successful publish means the broker accepted the message; there is no
/// acknowledgment of downstream processing and no way to retract it.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish(&self, exchange: &str, routing_key: &str, payload: &str) -> Result<()>;
}
