//! Time-boxed "unavailable" flags for providers, kept in the cache store.
//!
//! A flag is a plain key with a TTL. Absent means healthy. Marking twice just
//! rewrites the flag and restarts the window.

use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{cache::CacheStore, keys, provider::ProviderId};

/// How long a failed provider is skipped.
pub const UNAVAILABLE_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct HealthTracker {
    store: Arc<dyn CacheStore>,
    namespace: &'static str,
    window: Duration,
}

impl HealthTracker {
    pub fn new(store: Arc<dyn CacheStore>, namespace: &'static str) -> Self {
        Self::with_window(store, namespace, UNAVAILABLE_WINDOW)
    }

    pub fn with_window(store: Arc<dyn CacheStore>, namespace: &'static str, window: Duration) -> Self {
        Self { store, namespace, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// A store failure reads as healthy.
    pub async fn is_unavailable(&self, provider: ProviderId) -> bool {
        let key = keys::unavailable_key(self.namespace, provider);
        match self.store.get(&key).await {
            Ok(flag) => flag.is_some(),
            Err(e) => {
                warn!(provider = %provider, error = %e, "Health flag read failed, assuming healthy");
                false
            }
        }
    }

    pub async fn mark_unavailable(&self, provider: ProviderId) {
        let key = keys::unavailable_key(self.namespace, provider);
        match self.store.set(&key, "true", self.window).await {
            Ok(()) => debug!(
                provider = %provider,
                window_seconds = self.window.as_secs(),
                "Provider marked unavailable"
            ),
            Err(e) => warn!(provider = %provider, error = %e, "Failed to record provider failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCacheStore, failing::FailingStore};

    #[tokio::test]
    async fn provider_is_healthy_by_default() {
        let tracker = HealthTracker::new(Arc::new(MemoryCacheStore::new()), "current_weather");
        assert!(!tracker.is_unavailable(ProviderId::OpenWeather).await);
    }

    #[tokio::test(start_paused = true)]
    async fn flag_expires_after_window() {
        let store = Arc::new(MemoryCacheStore::new());
        let tracker = HealthTracker::new(store.clone(), "current_weather");

        tracker.mark_unavailable(ProviderId::OpenWeather).await;
        assert!(tracker.is_unavailable(ProviderId::OpenWeather).await);
        assert!(!tracker.is_unavailable(ProviderId::Weatherbit).await);
        assert_eq!(store.ttl("current_weather:openweather_unavailable").await.unwrap(), 300);

        tokio::time::advance(UNAVAILABLE_WINDOW - Duration::from_secs(1)).await;
        assert!(tracker.is_unavailable(ProviderId::OpenWeather).await);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!tracker.is_unavailable(ProviderId::OpenWeather).await);
    }

    #[tokio::test]
    async fn unreachable_store_reads_as_healthy() {
        let tracker = HealthTracker::new(Arc::new(FailingStore), "daily_forecast");

        tracker.mark_unavailable(ProviderId::OpenWeather).await;
        assert!(!tracker.is_unavailable(ProviderId::OpenWeather).await);
    }

    #[tokio::test]
    async fn flags_are_scoped_by_namespace() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let current = HealthTracker::new(store.clone(), "current_weather");
        let daily = HealthTracker::new(store, "daily_forecast");

        current.mark_unavailable(ProviderId::Weatherbit).await;
        assert!(current.is_unavailable(ProviderId::Weatherbit).await);
        assert!(!daily.is_unavailable(ProviderId::Weatherbit).await);
    }
}
