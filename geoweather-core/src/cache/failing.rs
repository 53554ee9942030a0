//! Store whose every operation fails, for exercising degraded paths.

use std::time::Duration;

use async_trait::async_trait;

use super::CacheStore;
use crate::error::{CacheError, CacheResult};

#[derive(Debug, Default)]
pub(crate) struct FailingStore;

fn unreachable_backend<T>() -> CacheResult<T> {
    Err(CacheError::Backend("connection reset by peer".into()))
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        unreachable_backend()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        unreachable_backend()
    }

    async fn ttl(&self, _key: &str) -> CacheResult<i64> {
        unreachable_backend()
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        unreachable_backend()
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}
