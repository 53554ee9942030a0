use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::LookupError,
    http::RequestExecutor,
    model::{Coordinates, Weather, WeatherStatus},
};

use super::{Provider, ProviderId, WeatherProvider};

pub const BASE_URL: &str = "https://api.weatherbit.io/v2.0";
const FORECAST_DAYS: u32 = 7;

#[derive(Debug, Clone)]
pub struct WeatherbitProvider {
    api_key: String,
    base_url: String,
    executor: Arc<RequestExecutor>,
}

impl WeatherbitProvider {
    pub fn new(api_key: String, executor: Arc<RequestExecutor>) -> Self {
        Self { api_key, base_url: BASE_URL.to_string(), executor }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn params(&self, coords: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
            ("key", self.api_key.clone()),
            ("units", "M".to_string()),
        ]
    }
}

#[async_trait]
impl WeatherProvider for WeatherbitProvider {
    async fn current(&self, coords: Coordinates) -> Result<Weather, LookupError> {
        let url = format!("{}/current", self.base_url);
        let body = self.executor.execute(&url, &self.params(coords), &[]).await?;
        parse_current(&body)
    }

    async fn forecast(&self, coords: Coordinates) -> Result<Vec<Weather>, LookupError> {
        let url = format!("{}/forecast/daily", self.base_url);
        let mut params = self.params(coords);
        params.push(("days", FORECAST_DAYS.to_string()));

        let body = self.executor.execute(&url, &params, &[]).await?;
        parse_forecast(&body)
    }
}

impl Provider for WeatherbitProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Weatherbit
    }
}

#[derive(Debug, Deserialize)]
struct WbCondition {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct WbObservation {
    temp: f64,
    app_temp: f64,
    rh: f64,
    wind_spd: f64,
    datetime: String,
    weather: WbCondition,
    max_temp: Option<f64>,
    min_temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WbDay {
    temp: f64,
    app_max_temp: f64,
    rh: f64,
    wind_spd: f64,
    datetime: String,
    weather: WbCondition,
    max_temp: Option<f64>,
    min_temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WbResponse<T> {
    data: Vec<T>,
}

/// Parse a `/current` payload; only the first observation is used.
pub fn parse_current(body: &str) -> Result<Weather, LookupError> {
    let parsed: WbResponse<WbObservation> = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse weather response: {e}")))?;

    let obs = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::Parse("Weatherbit response contained no data".into()))?;

    Ok(Weather {
        temperature: obs.temp,
        feels_like: obs.app_temp,
        status: map_status(obs.weather.code),
        humidity: obs.rh,
        wind_speed: obs.wind_spd,
        date: parse_date(&obs.datetime)?,
        max_temp: obs.max_temp,
        min_temp: obs.min_temp,
    })
}

/// Parse a `/forecast/daily` payload.
pub fn parse_forecast(body: &str) -> Result<Vec<Weather>, LookupError> {
    let parsed: WbResponse<WbDay> = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse forecast response: {e}")))?;

    parsed
        .data
        .into_iter()
        .map(|day| {
            Ok(Weather {
                temperature: day.temp,
                feels_like: day.app_max_temp,
                status: map_status(day.weather.code),
                humidity: day.rh,
                wind_speed: day.wind_spd,
                date: parse_date(&day.datetime)?,
                max_temp: day.max_temp,
                min_temp: day.min_temp,
            })
        })
        .collect()
}

fn map_status(code: i64) -> WeatherStatus {
    match code {
        200..=233 => WeatherStatus::Stormy,
        300..=302 | 500..=522 => WeatherStatus::Rainy,
        600..=623 => WeatherStatus::Snowy,
        700..=751 => WeatherStatus::Foggy,
        800 => WeatherStatus::Clear,
        801..=803 => WeatherStatus::PartlyCloudy,
        804 => WeatherStatus::Cloudy,
        _ => WeatherStatus::Unknown,
    }
}

/// Accepts `2024-06-01` and the hourly `2024-06-01:13` form.
fn parse_date(raw: &str) -> Result<NaiveDate, LookupError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| LookupError::Parse(format!("Invalid date '{raw}': {e}")))
}
