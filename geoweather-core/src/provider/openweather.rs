use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::{
    error::LookupError,
    http::RequestExecutor,
    model::{Coordinates, Weather, WeatherStatus},
};

use super::{Provider, ProviderId, WeatherProvider};

pub const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    executor: Arc<RequestExecutor>,
}

impl OpenWeatherProvider {
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
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ]
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, coords: Coordinates) -> Result<Weather, LookupError> {
        let url = format!("{}/weather", self.base_url);
        let body = self.executor.execute(&url, &self.params(coords), &[]).await?;
        parse_current(&body)
    }

    async fn forecast(&self, coords: Coordinates) -> Result<Vec<Weather>, LookupError> {
        let url = format!("{}/onecall", self.base_url);
        let mut params = self.params(coords);
        params.push(("exclude", "current,minutely,hourly,alerts".to_string()));

        let body = self.executor.execute(&url, &params, &[]).await?;
        parse_forecast(&body)
    }
}

impl Provider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    temp_max: Option<f64>,
    temp_min: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwDailyTemp {
    day: f64,
    max: Option<f64>,
    min: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwDailyFeelsLike {
    day: f64,
}

#[derive(Debug, Deserialize)]
struct OwDaily {
    dt: i64,
    temp: OwDailyTemp,
    feels_like: OwDailyFeelsLike,
    humidity: f64,
    wind_speed: f64,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    daily: Vec<OwDaily>,
}

/// Parse a `/weather` payload.
pub fn parse_current(body: &str) -> Result<Weather, LookupError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse weather response: {e}")))?;

    Ok(Weather {
        temperature: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        status: map_status(parsed.weather.first().map(|w| w.icon.as_str())),
        humidity: parsed.main.humidity,
        wind_speed: parsed.wind.speed,
        date: unix_to_date(parsed.dt)?,
        max_temp: parsed.main.temp_max,
        min_temp: parsed.main.temp_min,
    })
}

/// Parse a `/onecall` payload restricted to daily readings.
pub fn parse_forecast(body: &str) -> Result<Vec<Weather>, LookupError> {
    let parsed: OwForecastResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse forecast response: {e}")))?;

    parsed
        .daily
        .into_iter()
        .map(|day| {
            Ok(Weather {
                temperature: day.temp.day,
                feels_like: day.feels_like.day,
                status: map_status(day.weather.first().map(|w| w.icon.as_str())),
                humidity: day.humidity,
                wind_speed: day.wind_speed,
                date: unix_to_date(day.dt)?,
                max_temp: day.temp.max,
                min_temp: day.temp.min,
            })
        })
        .collect()
}

/// Icon codes come in day (`d`) and night (`n`) variants.
fn map_status(icon: Option<&str>) -> WeatherStatus {
    match icon {
        Some("01d" | "01n") => WeatherStatus::Clear,
        Some("02d" | "02n") => WeatherStatus::PartlyCloudy,
        Some("03d" | "03n" | "04d" | "04n") => WeatherStatus::Cloudy,
        Some("09d" | "09n" | "10d" | "10n") => WeatherStatus::Rainy,
        Some("11d" | "11n") => WeatherStatus::Stormy,
        Some("13d" | "13n") => WeatherStatus::Snowy,
        Some("50d" | "50n") => WeatherStatus::Foggy,
        _ => WeatherStatus::Unknown,
    }
}

fn unix_to_date(ts: i64) -> Result<NaiveDate, LookupError> {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| LookupError::Parse(format!("Invalid timestamp {ts}")))
}
