//! In-process cache store.
//!
//! Not shared between processes. Expiry runs on the tokio clock so tests can
//! pause and advance time. Expired entries are dropped when read and swept on
//! every write, so keys that are never read again do not accumulate.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{CacheStore, TTL_MISSING, TTL_PERSISTENT};
use crate::error::CacheResult;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value that never expires.
    pub fn set_persistent(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_string(), Entry { value: value.to_string(), expires_at: None });
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?.clone();
        if entry.is_expired(now) {
            entries.remove(key);
            return None;
        }
        Some(entry)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let result = self.live_entry(key).map(|e| e.value);

        if result.is_some() {
            debug!(key = key, "Cache HIT (memory)");
        } else {
            debug!(key = key, "Cache MISS (memory)");
        }

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(
            key.to_string(),
            Entry { value: value.to_string(), expires_at: Some(now + ttl) },
        );
        drop(entries);

        debug!(key = key, ttl_seconds = ttl.as_secs(), "Cache SET (memory)");
        Ok(())
    }

    async fn ttl(&self, key: &str) -> CacheResult<i64> {
        let Some(entry) = self.live_entry(key) else {
            return Ok(TTL_MISSING);
        };

        match entry.expires_at {
            None => Ok(TTL_PERSISTENT),
            Some(at) => {
                let remaining = at.saturating_duration_since(Instant::now());
                // Rounded to the nearest second, like Redis.
                Ok(((remaining.as_millis() + 500) / 1000) as i64)
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().remove(key);
        debug!(key = key, "Cache DEL (memory)");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
