//! Ordered provider fallback.
//!
//! Providers are tried in the order given. Flagged providers are skipped
//! without a call, the first success wins, and every failure flags its
//! provider for the health tracker's window. There is no half-open probing: a
//! flagged provider stays out until the flag expires.

use std::{future::Future, sync::Arc};

use tracing::{debug, warn};

use crate::{error::LookupError, health::HealthTracker, provider::Provider};

/// What a fallback run produced.
#[derive(Debug)]
pub struct Resolution<T> {
    pub value: Option<T>,
    /// Error of the last provider that failed, if any did.
    pub last_error: Option<LookupError>,
}

impl<T> Resolution<T> {
    /// The value, or the reason there is none.
    pub fn into_result(self) -> Result<T, LookupError> {
        match self.value {
            Some(value) => Ok(value),
            None => Err(self.last_error.unwrap_or(LookupError::AllProvidersExhausted)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fallback {
    health: HealthTracker,
}

impl Fallback {
    pub fn new(health: HealthTracker) -> Self {
        Self { health }
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub async fn resolve<P, T, F, Fut>(&self, providers: &[Arc<P>], mut operation: F) -> Resolution<T>
    where
        P: Provider + ?Sized,
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let mut last_error = None;

        for provider in providers {
            let id = provider.id();

            if self.health.is_unavailable(id).await {
                debug!(provider = %id, "Skipping provider flagged unavailable");
                continue;
            }

            match operation(Arc::clone(provider)).await {
                Ok(value) => {
                    debug!(provider = %id, "Provider succeeded");
                    return Resolution { value: Some(value), last_error };
                }
                Err(e) => {
                    warn!(provider = %id, error = %e, "Provider failed, falling back");
                    self.health.mark_unavailable(id).await;
                    last_error = Some(e);
                }
            }
        }

        if last_error.is_none() {
            debug!("No provider available");
        }
        Resolution { value: None, last_error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCacheStore};
    use crate::provider::ProviderId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Stub {
        id: ProviderId,
        fails: bool,
        calls: AtomicUsize,
    }

    impl Stub {
        fn new(id: ProviderId, fails: bool) -> Arc<Self> {
            Arc::new(Self { id, fails, calls: AtomicUsize::new(0) })
        }

        async fn call(&self) -> Result<&'static str, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                Err(LookupError::Upstream(format!("{} down", self.id)))
            } else {
                Ok(self.id.as_str())
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Provider for Stub {
        fn id(&self) -> ProviderId {
            self.id
        }
    }

    fn fallback(store: Arc<MemoryCacheStore>) -> Fallback {
        Fallback::new(HealthTracker::new(store, "current_weather"))
    }

    #[tokio::test]
    async fn first_success_wins() {
        let store = Arc::new(MemoryCacheStore::new());
        let a = Stub::new(ProviderId::OpenWeather, false);
        let b = Stub::new(ProviderId::Weatherbit, false);

        let res = fallback(store.clone())
            .resolve(&[a.clone(), b.clone()], |p| async move { p.call().await })
            .await;

        assert_eq!(res.value, Some("openweather"));
        assert!(res.last_error.is_none());
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_falls_through_and_flags_provider() {
        let store = Arc::new(MemoryCacheStore::new());
        let a = Stub::new(ProviderId::OpenWeather, true);
        let b = Stub::new(ProviderId::Weatherbit, false);

        let res = fallback(store.clone())
            .resolve(&[a.clone(), b.clone()], |p| async move { p.call().await })
            .await;

        assert_eq!(res.value, Some("weatherbit"));
        assert!(matches!(res.last_error, Some(LookupError::Upstream(_))));
        assert_eq!(
            store.ttl("current_weather:openweather_unavailable").await.unwrap(),
            300
        );
        assert_eq!(store.ttl("current_weather:weatherbit_unavailable").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn all_failures_keep_last_error_and_skip_next_time() {
        let store = Arc::new(MemoryCacheStore::new());
        let a = Stub::new(ProviderId::OpenWeather, true);
        let b = Stub::new(ProviderId::Weatherbit, true);
        let fb = fallback(store);

        let res = fb.resolve(&[a.clone(), b.clone()], |p| async move { p.call().await }).await;
        assert!(res.value.is_none());
        match res.last_error {
            Some(LookupError::Upstream(msg)) => assert_eq!(msg, "weatherbit down"),
            other => panic!("expected last upstream error, got {other:?}"),
        }

        let again = fb.resolve(&[a.clone(), b.clone()], |p| async move { p.call().await }).await;
        assert!(again.value.is_none());
        assert!(again.last_error.is_none());
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert!(matches!(again.into_result(), Err(LookupError::AllProvidersExhausted)));
    }

    #[tokio::test]
    async fn empty_provider_list_yields_nothing() {
        let fb = fallback(Arc::new(MemoryCacheStore::new()));
        let providers: Vec<Arc<Stub>> = Vec::new();
        let res = fb.resolve(&providers, |p| async move { p.call().await }).await;
        assert!(res.value.is_none());
        assert!(res.last_error.is_none());
    }
}
