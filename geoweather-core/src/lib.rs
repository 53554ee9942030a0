//! Core library for the `geoweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Address and weather providers behind a common capability
//! - A rate-limit aware HTTP executor
//! - Provider fallback with time-boxed health flags
//! - Cache-aside lookups over a TTL cache store (memory or Redis)
//!
//! It is used by `geoweather-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod health;
pub mod http;
pub mod keys;
pub mod lookup;
pub mod model;
pub mod provider;

pub use cache::{CacheStore, MemoryCacheStore};
pub use config::{CacheConfig, Config, HttpConfig, ProviderConfig};
pub use error::{CacheError, LookupError};
pub use http::{RequestExecutor, RetryPolicy};
pub use lookup::{AddressLookup, CachedLookup, LookupPolicy, WeatherLookup};
pub use model::{Address, AddressQuery, Coordinates, LookupResult, Weather, WeatherStatus};
pub use provider::{GeocodingProvider, Provider, ProviderId, WeatherProvider};
