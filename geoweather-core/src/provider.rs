use crate::{
    Config,
    error::LookupError,
    http::RequestExecutor,
    model::{AddressQuery, Address, Coordinates, Weather},
    provider::{
        here::HereMapsProvider, mapbox::MapboxProvider, openweather::OpenWeatherProvider,
        weatherbit::WeatherbitProvider,
    },
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};
use tracing::warn;

pub mod here;
pub mod mapbox;
pub mod openweather;
pub mod weatherbit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Mapbox,
    HereMaps,
    OpenWeather,
    Weatherbit,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Mapbox => "mapbox",
            ProviderId::HereMaps => "heremaps",
            ProviderId::OpenWeather => "openweather",
            ProviderId::Weatherbit => "weatherbit",
        }
    }

    /// Environment variable holding the provider's credential.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::Mapbox => "MAPBOX_ACCESS_TOKEN",
            ProviderId::HereMaps => "HERE_MAPS_API_KEY",
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::Weatherbit => "WEATHERBIT_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Mapbox, ProviderId::HereMaps, ProviderId::OpenWeather, ProviderId::Weatherbit]
    }

    /// Geocoding providers in preference order.
    pub const fn geocoding() -> &'static [ProviderId] {
        &[ProviderId::Mapbox, ProviderId::HereMaps]
    }

    /// Weather providers in preference order.
    pub const fn weather() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::Weatherbit]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "mapbox" => Ok(ProviderId::Mapbox),
            "heremaps" | "here" => Ok(ProviderId::HereMaps),
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherbit" => Ok(ProviderId::Weatherbit),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: mapbox, heremaps, openweather, weatherbit."
            )),
        }
    }
}

/// Identity shared by every provider; keys its health flag.
pub trait Provider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;
}

/// Address search backed by a third-party geocoder.
///
/// Implementations must return an error for any non-success upstream outcome
/// so the fallback chain can move on.
#[async_trait]
pub trait GeocodingProvider: Provider {
    async fn search(&self, query: &AddressQuery) -> Result<Vec<Address>, LookupError>;
}

#[async_trait]
pub trait WeatherProvider: Provider {
    async fn current(&self, coords: Coordinates) -> Result<Weather, LookupError>;

    /// Seven daily readings starting today.
    async fn forecast(&self, coords: Coordinates) -> Result<Vec<Weather>, LookupError>;
}

/// Geocoders in preference order. Providers without a credential are left out.
pub fn geocoding_chain(
    config: &Config,
    executor: Arc<RequestExecutor>,
) -> Vec<Arc<dyn GeocodingProvider>> {
    ProviderId::geocoding()
        .iter()
        .filter_map(|&id| {
            let api_key = configured_key(config, id)?;
            let provider: Arc<dyn GeocodingProvider> = match id {
                ProviderId::Mapbox => Arc::new(MapboxProvider::new(api_key, executor.clone())),
                _ => Arc::new(HereMapsProvider::new(api_key, executor.clone())),
            };
            Some(provider)
        })
        .collect()
}

/// Weather sources in preference order. Providers without a credential are left out.
pub fn weather_chain(
    config: &Config,
    executor: Arc<RequestExecutor>,
) -> Vec<Arc<dyn WeatherProvider>> {
    ProviderId::weather()
        .iter()
        .filter_map(|&id| {
            let api_key = configured_key(config, id)?;
            let provider: Arc<dyn WeatherProvider> = match id {
                ProviderId::OpenWeather => {
                    Arc::new(OpenWeatherProvider::new(api_key, executor.clone()))
                }
                _ => Arc::new(WeatherbitProvider::new(api_key, executor.clone())),
            };
            Some(provider)
        })
        .collect()
}

fn configured_key(config: &Config, id: ProviderId) -> Option<String> {
    let key = config.provider_api_key(id).map(str::to_owned);
    if key.is_none() {
        warn!(
            provider = %id,
            "No API key configured, provider skipped. Hint: run `geoweather configure {id}` or set {}",
            id.env_var()
        );
    }
    key
}
