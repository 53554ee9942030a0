use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::LookupError,
    http::RequestExecutor,
    model::{Address, AddressQuery},
};

use super::{GeocodingProvider, Provider, ProviderId};

pub const BASE_URL: &str = "https://geocode.search.hereapi.com/v1/geocode";

#[derive(Debug, Clone)]
pub struct HereMapsProvider {
    api_key: String,
    base_url: String,
    executor: Arc<RequestExecutor>,
}

impl HereMapsProvider {
    pub fn new(api_key: String, executor: Arc<RequestExecutor>) -> Self {
        Self { api_key, base_url: BASE_URL.to_string(), executor }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl GeocodingProvider for HereMapsProvider {
    async fn search(&self, request: &AddressQuery) -> Result<Vec<Address>, LookupError> {
        let params = [("q", request.query.clone()), ("apiKey", self.api_key.clone())];

        let body = self
            .executor
            .execute(&self.base_url, &params, &[("Accept", "application/json")])
            .await?;
        parse_items(&body)
    }
}

impl Provider for HereMapsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::HereMaps
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HereAddress {
    label: String,
    country_name: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HerePosition {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct HereItem {
    title: String,
    address: HereAddress,
    position: HerePosition,
}

#[derive(Debug, Deserialize)]
struct HereResponse {
    items: Vec<HereItem>,
}

/// Parse a HERE geocode payload.
pub fn parse_items(body: &str) -> Result<Vec<Address>, LookupError> {
    let parsed: HereResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse HERE response: {e}")))?;

    Ok(parsed
        .items
        .into_iter()
        .map(|item| Address {
            name: item.title,
            address: item.address.label,
            latitude: item.position.lat,
            longitude: item.position.lng,
            country: item.address.country_name,
            city: item.address.city,
            postcode: item.address.postal_code.as_deref().and_then(short_postcode),
        })
        .collect())
}

/// ZIP+4 style codes are cut to their first segment.
fn short_postcode(raw: &str) -> Option<String> {
    raw.split('-').next().filter(|s| !s.is_empty()).map(str::to_owned)
}
