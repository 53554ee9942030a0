use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// A place returned by a geocoding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

/// Partial address typed by a user, plus the caller's session token.
#[derive(Debug, Clone)]
pub struct AddressQuery {
    pub query: String,
    pub session_token: Option<String>,
}

impl AddressQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), session_token: None }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

/// Provider-independent weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherStatus {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
    Foggy,
    #[default]
    Unknown,
}

/// One weather reading, either current conditions or a forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: f64,
    pub feels_like: f64,
    pub status: WeatherStatus,
    pub humidity: f64,
    pub wind_speed: f64,
    pub date: NaiveDate,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Validated constructor for inbound coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LookupError> {
        let lat_ok = (-90.0..=90.0).contains(&latitude);
        let lon_ok = (-180.0..=180.0).contains(&longitude);
        if !lat_ok || !lon_ok {
            return Err(LookupError::InvalidCoordinates { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }
}

/// Outcome of a cached lookup.
///
/// `cache_age` is only populated on a cache hit, and only when the store could
/// report a positive remaining TTL for the entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult<T> {
    pub data: Option<T>,
    pub cache_hit: bool,
    pub cache_age: Option<u64>,
    pub error: Option<String>,
}

impl<T> Default for LookupResult<T> {
    fn default() -> Self {
        Self { data: None, cache_hit: false, cache_age: None, error: None }
    }
}

impl<T> LookupResult<T> {
    pub fn fresh(data: T) -> Self {
        Self { data: Some(data), ..Self::default() }
    }

    pub fn cached(data: T, cache_age: Option<u64>) -> Self {
        Self { data: Some(data), cache_hit: true, cache_age, error: None }
    }

    pub fn failed(error: Option<String>) -> Self {
        Self { error, ..Self::default() }
    }
}

/// Lets the lookup layer tell an empty provider answer from a real one.
///
/// Empty answers are returned but never cached, and an empty cached entry
/// reads as a miss. A single `Weather` reading is never empty. An empty
/// forecast still ends the chain and reaches the caller as `Some([])` with no
/// error.
pub trait Payload {
    fn is_empty_payload(&self) -> bool {
        false
    }
}

impl<T> Payload for Vec<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for Weather {}
