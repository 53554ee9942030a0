//! Key/value cache stores with per-entry TTL.
//!
//! The lookup engine only needs `get`, `set` with expiry, a remaining-TTL read
//! and `delete`. Backends are shared as `Arc<dyn CacheStore>`.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::info;

use crate::{config::CacheConfig, error::CacheResult};

#[cfg(test)]
pub(crate) mod failing;
pub mod memory;
#[cfg(feature = "cache-redis")]
pub mod redis;

pub use memory::MemoryCacheStore;
#[cfg(feature = "cache-redis")]
pub use self::redis::RedisCacheStore;

/// `ttl` result for a key that does not exist.
pub const TTL_MISSING: i64 = -2;
/// `ttl` result for a key that exists without an expiry.
pub const TTL_PERSISTENT: i64 = -1;

#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remaining lifetime in whole seconds, [`TTL_MISSING`] or [`TTL_PERSISTENT`].
    async fn ttl(&self, key: &str) -> CacheResult<i64>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    fn provider_name(&self) -> &'static str;
}

/// Open the store selected by `config`: Redis when a URL is set, otherwise
/// an in-process store.
pub async fn connect(config: &CacheConfig) -> CacheResult<Arc<dyn CacheStore>> {
    match config.redis_url.as_deref() {
        #[cfg(feature = "cache-redis")]
        Some(url) => Ok(Arc::new(RedisCacheStore::connect(url).await?)),
        #[cfg(not(feature = "cache-redis"))]
        Some(_) => {
            tracing::warn!("redis_url is set but the cache-redis feature is disabled; using memory");
            Ok(Arc::new(MemoryCacheStore::new()))
        }
        None => {
            info!("No redis_url configured, caching in memory for this process only");
            Ok(Arc::new(MemoryCacheStore::new()))
        }
    }
}
