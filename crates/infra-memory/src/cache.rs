// In-memory KeyValueCache with per-key expiry

use crate::fault::FaultInjector;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use healthcheck_core::error::Result;
use healthcheck_core::port::KeyValueCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Writes between automatic sweeps of expired entries
const SWEEP_EVERY: u64 = 256;

/// Thread-safe cache; expired keys behave as absent
///
/// Expired entries are evicted by a sweep every `SWEEP_EVERY` writes, or
/// on demand through [`InMemoryCache::cleanup_expired`].
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    writes: AtomicU64,
    faults: FaultInjector,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault switches, keyed by operation (`set`, `set_if_absent`, `get`, `delete`)
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Live value of `key`, bypassing fault injection
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|e| e.is_live())
            .map(|e| e.value.clone())
    }

    /// Remaining time to live of `key`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|e| e.is_live())
            .map(|e| e.expires_at.saturating_duration_since(Instant::now()))
    }

    /// Live keys starting with `prefix`
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && e.value().is_live())
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of stored entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Evicted expired cache entries");
        }
        removed
    }

    /// Count a write and sweep when due; must not run under an entry guard
    fn note_write(&self) {
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            self.cleanup_expired();
        }
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.faults.check("set")?;
        self.entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        self.note_write();
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.faults.check("set_if_absent")?;

        // The entry guard holds the shard lock, so check-and-set is atomic
        let written = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    false
                } else {
                    occupied.insert(CacheEntry::new(value, ttl));
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl));
                true
            }
        };
        if written {
            self.note_write();
        }
        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.faults.check("get")?;
        Ok(self.peek(key))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.faults.check("delete")?;
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live()))
    }
}
