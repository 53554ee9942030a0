use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    error::LookupError,
    http::RequestExecutor,
    model::{Address, AddressQuery},
};

use super::{GeocodingProvider, Provider, ProviderId};

pub const BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

#[derive(Debug, Clone)]
pub struct MapboxProvider {
    access_token: String,
    base_url: String,
    executor: Arc<RequestExecutor>,
}

impl MapboxProvider {
    pub fn new(access_token: String, executor: Arc<RequestExecutor>) -> Self {
        Self { access_token, base_url: BASE_URL.to_string(), executor }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `<base>/<percent-encoded query>.json`
    fn search_url(&self, query: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| LookupError::Upstream(format!("Invalid Mapbox URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Upstream("Mapbox URL cannot take a path".into()))?
            .pop_if_empty()
            .push(&format!("{query}.json"));
        Ok(url)
    }
}

#[async_trait]
impl GeocodingProvider for MapboxProvider {
    async fn search(&self, request: &AddressQuery) -> Result<Vec<Address>, LookupError> {
        let url = self.search_url(&request.query)?;

        let mut params = vec![("access_token", self.access_token.clone())];
        if let Some(token) = request.session_token.as_deref().filter(|t| !t.is_empty()) {
            params.push(("session_token", token.to_string()));
        }

        let body = self
            .executor
            .execute(url.as_str(), &params, &[("Accept", "application/json")])
            .await?;
        parse_features(&body)
    }
}

impl Provider for MapboxProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Mapbox
    }
}

#[derive(Debug, Deserialize)]
struct MbGeometry {
    /// `[longitude, latitude]`
    coordinates: (f64, f64),
}

#[derive(Debug, Deserialize)]
struct MbContext {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct MbFeature {
    text: String,
    place_name: String,
    geometry: MbGeometry,
    #[serde(default)]
    context: Vec<MbContext>,
}

#[derive(Debug, Deserialize)]
struct MbResponse {
    features: Vec<MbFeature>,
}

/// Parse a Mapbox places payload.
pub fn parse_features(body: &str) -> Result<Vec<Address>, LookupError> {
    let parsed: MbResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse Mapbox response: {e}")))?;

    Ok(parsed
        .features
        .into_iter()
        .map(|feature| {
            let context = |prefix: &str| {
                feature
                    .context
                    .iter()
                    .find(|c| c.id.starts_with(prefix))
                    .map(|c| c.text.clone())
            };
            let (longitude, latitude) = feature.geometry.coordinates;

            Address {
                country: context("country"),
                city: context("place"),
                postcode: context("postcode"),
                name: feature.text.clone(),
                address: feature.place_name.clone(),
                latitude,
                longitude,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn features_json() -> serde_json::Value {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "text": "Milwaukee Avenue",
                "place_name": "825 Milwaukee Avenue, Chicago, Illinois 60642, United States",
                "geometry": { "type": "Point", "coordinates": [-87.6555, 41.8967] },
                "context": [
                    { "id": "postcode.123", "text": "60642" },
                    { "id": "place.456", "text": "Chicago" },
                    { "id": "region.789", "text": "Illinois" },
                    { "id": "country.1", "text": "United States" }
                ]
            }]
        })
    }

    #[test]
    fn parses_features_with_context() {
        let addresses = parse_features(&features_json().to_string()).unwrap();

        assert_eq!(addresses.len(), 1);
        let a = &addresses[0];
        assert_eq!(a.name, "Milwaukee Avenue");
        assert_eq!(a.latitude, 41.8967);
        assert_eq!(a.longitude, -87.6555);
        assert_eq!(a.city.as_deref(), Some("Chicago"));
        assert_eq!(a.country.as_deref(), Some("United States"));
        assert_eq!(a.postcode.as_deref(), Some("60642"));
    }

    #[test]
    fn missing_context_leaves_fields_empty() {
        let body = serde_json::json!({
            "features": [{
                "text": "Atlantic Ocean",
                "place_name": "Atlantic Ocean",
                "geometry": { "coordinates": [-30.0, 20.0] }
            }]
        });
        let addresses = parse_features(&body.to_string()).unwrap();
        assert_eq!(addresses[0].city, None);
        assert_eq!(addresses[0].country, None);
    }

    #[test]
    fn search_url_encodes_query() {
        let executor =
            Arc::new(RequestExecutor::new(RetryPolicy::default(), Duration::from_secs(1)).unwrap());
        let provider = MapboxProvider::new("TOKEN".into(), executor);
        let url = provider.search_url("825 Milwaukee Ave").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.mapbox.com/geocoding/v5/mapbox.places/825%20Milwaukee%20Ave.json"
        );
    }

    #[tokio::test]
    async fn searches_with_session_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geocoding/825%20Milwaukee%20Ave.json"))
            .and(query_param("access_token", "TOKEN"))
            .and(query_param("session_token", "session-1"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(features_json()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let executor =
            Arc::new(RequestExecutor::new(RetryPolicy::default(), Duration::from_secs(5)).unwrap());
        let provider = MapboxProvider::new("TOKEN".into(), executor)
            .with_base_url(format!("{}/geocoding", mock_server.uri()));

        let query = AddressQuery::new("825 Milwaukee Ave").with_session_token("session-1");
        let addresses = provider.search(&query).await.unwrap();
        assert_eq!(addresses.len(), 1);
    }
}
