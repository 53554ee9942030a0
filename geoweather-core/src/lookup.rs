//! Cache-aside lookups over a provider fallback chain.
//!
//! One [`CachedLookup`] serves every domain; a [`LookupPolicy`] decides the
//! namespace, TTL, whether provider errors reach the caller and whether cache
//! age is reported. [`AddressLookup`] and [`WeatherLookup`] are the front
//! doors used by the CLI.

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    Config,
    cache::CacheStore,
    error::LookupError,
    fallback::Fallback,
    health::HealthTracker,
    http::RequestExecutor,
    keys,
    model::{Address, AddressQuery, Coordinates, LookupResult, Payload, Weather},
    provider::{GeocodingProvider, Provider, WeatherProvider, geocoding_chain, weather_chain},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupPolicy {
    pub namespace: &'static str,
    pub ttl: Duration,
    /// Put the last provider error into the result when nothing was found.
    pub surface_errors: bool,
    /// Compute `cache_age` on cache hits.
    pub report_cache_age: bool,
}

impl LookupPolicy {
    pub const ADDRESS: Self = Self {
        namespace: "geo:address_lookup",
        ttl: Duration::from_secs(5 * 60),
        surface_errors: false,
        report_cache_age: false,
    };

    pub const CURRENT_WEATHER: Self = Self {
        namespace: "current_weather",
        ttl: Duration::from_secs(30 * 60),
        surface_errors: true,
        report_cache_age: true,
    };

    pub const DAILY_FORECAST: Self = Self {
        namespace: "daily_forecast",
        ttl: Duration::from_secs(6 * 60 * 60),
        surface_errors: true,
        report_cache_age: true,
    };
}

#[derive(Debug, Clone)]
pub struct CachedLookup {
    store: Arc<dyn CacheStore>,
    fallback: Fallback,
    policy: LookupPolicy,
}

impl CachedLookup {
    pub fn new(store: Arc<dyn CacheStore>, policy: LookupPolicy) -> Self {
        let health = HealthTracker::new(store.clone(), policy.namespace);
        Self { store, fallback: Fallback::new(health), policy }
    }

    pub fn policy(&self) -> &LookupPolicy {
        &self.policy
    }

    /// Serve `key` from cache, or resolve it through `providers` and cache
    /// a non-empty answer.
    pub async fn run<P, T, F, Fut>(&self, key: &str, providers: &[Arc<P>], operation: F) -> LookupResult<T>
    where
        P: Provider + ?Sized,
        T: Payload + Serialize + DeserializeOwned,
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        if let Some(hit) = self.read_cache(key).await {
            return hit;
        }

        let resolution = self.fallback.resolve(providers, operation).await;

        match resolution.value {
            Some(value) => {
                if !value.is_empty_payload() {
                    self.write_cache(key, &value).await;
                }
                LookupResult::fresh(value)
            }
            None if self.policy.surface_errors => {
                let error = resolution.last_error.unwrap_or(LookupError::AllProvidersExhausted);
                LookupResult::failed(Some(error.to_string()))
            }
            None => LookupResult::default(),
        }
    }

    /// A present, decodable, non-empty entry is a hit whatever its TTL reads.
    async fn read_cache<T>(&self, key: &str) -> Option<LookupResult<T>>
    where
        T: Payload + DeserializeOwned,
    {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let data: T = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = key, error = %e, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        if data.is_empty_payload() {
            return None;
        }

        let age = if self.policy.report_cache_age { self.cache_age(key).await } else { None };
        debug!(key = key, cache_age = ?age, "Serving cached result");
        Some(LookupResult::cached(data, age))
    }

    /// Seconds since the entry was written, from the policy TTL minus what is left.
    async fn cache_age(&self, key: &str) -> Option<u64> {
        match self.store.ttl(key).await {
            Ok(remaining) if remaining > 0 => {
                Some(self.policy.ttl.as_secs().saturating_sub(remaining as u64))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(key = key, error = %e, "Cache TTL read failed");
                None
            }
        }
    }

    async fn write_cache<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize result for cache");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &raw, self.policy.ttl).await {
            warn!(key = key, error = %e, "Cache write failed");
        }
    }
}

/// Address search. Failures are silent: no result is an empty list.
#[derive(Debug, Clone)]
pub struct AddressLookup {
    lookup: CachedLookup,
    providers: Vec<Arc<dyn GeocodingProvider>>,
}

impl AddressLookup {
    pub fn new(store: Arc<dyn CacheStore>, providers: Vec<Arc<dyn GeocodingProvider>>) -> Self {
        Self { lookup: CachedLookup::new(store, LookupPolicy::ADDRESS), providers }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn CacheStore>,
        executor: Arc<RequestExecutor>,
    ) -> Self {
        Self::new(store, geocoding_chain(config, executor))
    }

    pub fn cache_key(query: &str) -> String {
        keys::query_key(LookupPolicy::ADDRESS.namespace, query)
    }

    pub async fn search(&self, query: &AddressQuery) -> Vec<Address> {
        let key = Self::cache_key(&query.query);
        self.lookup
            .run(&key, &self.providers, |provider| async move { provider.search(query).await })
            .await
            .data
            .unwrap_or_default()
    }
}

/// Current weather and 7-day forecast. Failures surface as `error`.
#[derive(Debug, Clone)]
pub struct WeatherLookup {
    current: CachedLookup,
    daily: CachedLookup,
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl WeatherLookup {
    pub fn new(store: Arc<dyn CacheStore>, providers: Vec<Arc<dyn WeatherProvider>>) -> Self {
        Self {
            current: CachedLookup::new(store.clone(), LookupPolicy::CURRENT_WEATHER),
            daily: CachedLookup::new(store, LookupPolicy::DAILY_FORECAST),
            providers,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn CacheStore>,
        executor: Arc<RequestExecutor>,
    ) -> Self {
        Self::new(store, weather_chain(config, executor))
    }

    pub async fn current(&self, coords: Coordinates) -> LookupResult<Weather> {
        let key = match keys::cell_key(LookupPolicy::CURRENT_WEATHER.namespace, coords) {
            Ok(key) => key,
            Err(e) => return LookupResult::failed(Some(e.to_string())),
        };

        self.current
            .run(&key, &self.providers, |provider| async move { provider.current(coords).await })
            .await
    }

    pub async fn forecast(&self, coords: Coordinates) -> LookupResult<Vec<Weather>> {
        let key = match keys::cell_key(LookupPolicy::DAILY_FORECAST.namespace, coords) {
            Ok(key) => key,
            Err(e) => return LookupResult::failed(Some(e.to_string())),
        };

        self.daily
            .run(&key, &self.providers, |provider| async move { provider.forecast(coords).await })
            .await
    }
}
