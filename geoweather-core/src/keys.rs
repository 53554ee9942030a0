//! Deterministic cache keys.

use h3o::{LatLng, Resolution};
use sha2::{Digest, Sha256};

use crate::{error::LookupError, model::Coordinates, provider::ProviderId};

/// H3 resolution for weather cells (~0.7 km² per cell).
pub const H3_RESOLUTION: Resolution = Resolution::Eight;

/// `<namespace>:<sha256-hex(query)>`.
pub fn query_key(namespace: &str, query: &str) -> String {
    format!("{namespace}:{}", sha256_hex(query))
}

/// `<namespace>:<h3 cell>`, shared by every coordinate inside the same cell.
pub fn cell_key(namespace: &str, coords: Coordinates) -> Result<String, LookupError> {
    let cell = h3_cell(coords)?;
    Ok(format!("{namespace}:{cell}"))
}

/// H3 cell index at [`H3_RESOLUTION`], as its integer value.
pub fn h3_cell(coords: Coordinates) -> Result<u64, LookupError> {
    let latlng = LatLng::new(coords.latitude, coords.longitude).map_err(|_| {
        LookupError::InvalidCoordinates { latitude: coords.latitude, longitude: coords.longitude }
    })?;
    Ok(u64::from(latlng.to_cell(H3_RESOLUTION)))
}

/// Key of the health flag for `provider` inside `namespace`.
pub fn unavailable_key(namespace: &str, provider: ProviderId) -> String {
    format!("{namespace}:{provider}_unavailable")
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn query_key_is_deterministic() {
        let a = query_key("geo:address_lookup", "825 Milwaukee Ave");
        let b = query_key("geo:address_lookup", "825 Milwaukee Ave");
        assert_eq!(a, b);
        assert!(a.starts_with("geo:address_lookup:"));
        // 64 hex chars of SHA-256 after the prefix.
        assert_eq!(a.len(), "geo:address_lookup:".len() + 64);
    }

    #[test]
    fn query_key_differs_per_query() {
        assert_ne!(query_key("ns", "Main St"), query_key("ns", "Main St."));
    }

    #[test]
    fn nearby_coordinates_share_a_cell_key() {
        let point = coords(40.1234, -74.0);
        let cell = LatLng::new(point.latitude, point.longitude).unwrap().to_cell(H3_RESOLUTION);
        let center = LatLng::from(cell);

        let a = cell_key("current_weather", point).unwrap();
        let b = cell_key("current_weather", coords(center.lat(), center.lng())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distant_coordinates_get_different_cells() {
        let a = cell_key("current_weather", coords(40.1234, -74.0)).unwrap();
        let b = cell_key("current_weather", coords(51.5074, -0.1278)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn cell_key_uses_namespace() {
        let c = coords(40.1234, -74.0);
        let current = cell_key("current_weather", c).unwrap();
        let daily = cell_key("daily_forecast", c).unwrap();
        assert_eq!(
            current.trim_start_matches("current_weather:"),
            daily.trim_start_matches("daily_forecast:")
        );
    }

    #[test]
    fn unavailable_key_format() {
        assert_eq!(
            unavailable_key("current_weather", ProviderId::OpenWeather),
            "current_weather:openweather_unavailable"
        );
    }
}
