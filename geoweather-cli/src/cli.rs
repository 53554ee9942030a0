use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geoweather_core::{
    AddressLookup, AddressQuery, Config, Coordinates, ProviderId, RequestExecutor, WeatherLookup,
    cache,
};
use inquire::{Password, PasswordDisplayMode};
use serde::Serialize;
use tracing::debug;

use crate::output::Envelope;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "geoweather", version, about = "Address search and weather lookups")]
pub struct Cli {
    /// Log lookup decisions to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an API key for a provider.
    Configure {
        /// One of: mapbox, heremaps, openweather, weatherbit.
        provider: String,
    },

    /// Search for addresses matching free text.
    Search {
        query: String,

        /// Mapbox session token, forwarded when present.
        #[arg(long)]
        session_token: Option<String>,
    },

    /// Current conditions at a coordinate.
    Current {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Seven-day daily forecast at a coordinate.
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

impl Cli {
    /// Runs the command and returns the process exit code.
    pub async fn run(self) -> Result<i32> {
        match self.command {
            Command::Configure { provider } => {
                configure(&provider)?;
                Ok(0)
            }
            Command::Search { query, session_token } => {
                let config = Config::load()?;
                let store = cache::connect(&config.cache).await?;
                let lookup = AddressLookup::from_config(&config, store, executor(&config)?);

                let mut request = AddressQuery::new(query);
                if let Some(token) = session_token {
                    request = request.with_session_token(token);
                }

                emit(&Envelope::addresses(lookup.search(&request).await))
            }
            Command::Current { lat, lon } => {
                let Some(coords) = coordinates(lat, lon)? else { return Ok(1) };
                let lookup = weather_lookup().await?;
                emit(&Envelope::from_lookup(lookup.current(coords).await))
            }
            Command::Forecast { lat, lon } => {
                let Some(coords) = coordinates(lat, lon)? else { return Ok(1) };
                let lookup = weather_lookup().await?;
                emit(&Envelope::from_lookup(lookup.forecast(coords).await))
            }
        }
    }
}

fn configure(provider: &str) -> Result<()> {
    let provider_id = ProviderId::try_from(provider)?;

    let path = Config::config_file_path()?;
    let prompt = format!("API key for {provider_id}:");
    let api_key = Password::new(&prompt)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    Config::store_provider_api_key(&path, provider_id, api_key.trim().to_string())?;

    println!("Saved {provider_id} key to {}", path.display());
    Ok(())
}

fn executor(config: &Config) -> Result<Arc<RequestExecutor>> {
    let executor = RequestExecutor::new(config.http.retry_policy(), config.http.timeout())?;
    Ok(Arc::new(executor))
}

async fn weather_lookup() -> Result<WeatherLookup> {
    let config = Config::load()?;
    let store = cache::connect(&config.cache).await?;
    debug!(store = store.provider_name(), "Cache store ready");
    Ok(WeatherLookup::from_config(&config, store, executor(&config)?))
}

/// Invalid coordinates print an error envelope and yield `None`.
fn coordinates(lat: f64, lon: f64) -> Result<Option<Coordinates>> {
    match Coordinates::new(lat, lon) {
        Ok(coords) => Ok(Some(coords)),
        Err(e) => {
            emit(&Envelope::<()>::invalid(e.to_string()))?;
            Ok(None)
        }
    }
}

fn emit<T: Serialize>(envelope: &Envelope<T>) -> Result<i32> {
    let json = serde_json::to_string_pretty(envelope).context("Failed to serialize output")?;
    println!("{json}");
    Ok(if envelope.is_success() { 0 } else { 1 })
}
