// Key-Value Cache Port

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value cache with per-key expiry
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Set `key` to `value`, replacing any previous value
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Set `key` only if it is absent (or expired)
    ///
    /// Returns `true` if the value was written. Used as a best-effort
    /// distributed lock.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Get the live value of `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete `key`; returns whether a live key was removed
    async fn delete(&self, key: &str) -> Result<bool>;
}
