use std::time::Duration;

use thiserror::Error;

/// Errors raised by a cache store backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while talking to providers or running a lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The upstream kept answering 429 after the retry budget ran out.
    #[error("Too many requests, retry after {} seconds", .retry_after.as_secs_f64())]
    RateLimited { retry_after: Duration },

    /// Non-success, non-429 status from a provider.
    #[error("Error fetching data: {0}")]
    Upstream(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    #[error("All providers are unavailable or failed")]
    AllProvidersExhausted,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

impl LookupError {
    /// Rate limiting is the only failure the executor retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::RateLimited { .. })
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Parse(err.to_string())
    }
}
