use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf, time::Duration};

use crate::{
    http::{DEFAULT_RETRY_LIMIT, DEFAULT_TIMEOUT_SECS, RetryPolicy},
    provider::ProviderId,
};

pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Where lookups are cached. Without a Redis URL an in-process store is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Retries allowed after a 429 response.
    pub retry_limit: u32,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { retry_limit: DEFAULT_RETRY_LIMIT, timeout_secs: DEFAULT_TIMEOUT_SECS }
    }
}

impl HttpConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_retries(self.retry_limit)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,

    pub cache: CacheConfig,

    pub http: HttpConfig,
}

impl Config {
    /// Load config from disk (empty defaults when missing), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "geoweather", "geoweather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay credentials and the Redis URL from the environment.
    /// Non-empty environment values win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for id in ProviderId::all() {
            if let Some(api_key) = non_empty(id.env_var()) {
                self.providers.insert(id.as_str().to_string(), ProviderConfig { api_key });
            }
        }

        if let Some(url) = non_empty(REDIS_URL_ENV) {
            self.cache.redis_url = Some(url);
        }
    }

    /// Set a provider key in the file at `path` and write it back.
    ///
    /// Works on the file contents only, so credentials that came from the
    /// environment are never written to disk.
    pub fn store_provider_api_key(
        path: &Path,
        provider_id: ProviderId,
        api_key: String,
    ) -> Result<()> {
        let mut cfg = Self::load_from(path)?;
        cfg.upsert_provider_api_key(provider_id, api_key);
        cfg.save_to(path)
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        let key = cfg.provider_api_key(ProviderId::OpenWeather);
        assert_eq!(key, Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
        assert!(!cfg.is_provider_configured(ProviderId::Weatherbit));
    }

    #[test]
    fn upsert_replaces_existing_key() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::Mapbox, "OLD".into());
        cfg.upsert_provider_api_key(ProviderId::Mapbox, "NEW".into());

        assert_eq!(cfg.provider_api_key(ProviderId::Mapbox), Some("NEW"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Weatherbit, "FROM_FILE".into());
        cfg.upsert_provider_api_key(ProviderId::HereMaps, "HERE_FILE".into());

        cfg.apply_env(|name| match name {
            "WEATHERBIT_API_KEY" => Some("FROM_ENV".into()),
            "HERE_MAPS_API_KEY" => Some("  ".into()),
            "REDIS_URL" => Some("redis://localhost:6379/2".into()),
            _ => None,
        });

        assert_eq!(cfg.provider_api_key(ProviderId::Weatherbit), Some("FROM_ENV"));
        assert_eq!(cfg.provider_api_key(ProviderId::HereMaps), Some("HERE_FILE"));
        assert!(!cfg.is_provider_configured(ProviderId::Mapbox));
        assert_eq!(cfg.cache.redis_url.as_deref(), Some("redis://localhost:6379/2"));
    }

    #[test]
    fn http_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.http.retry_limit, 2);
        assert_eq!(cfg.http.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.http.retry_policy().max_retries, 2);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [providers.mapbox]
            api_key = "MB"

            [http]
            retry_limit = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.provider_api_key(ProviderId::Mapbox), Some("MB"));
        assert_eq!(cfg.http.retry_limit, 5);
        assert_eq!(cfg.http.timeout_secs, 10);
        assert!(cfg.cache.redis_url.is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW".into());
        cfg.cache.redis_url = Some("redis://cache:6379/0".into());
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.provider_api_key(ProviderId::OpenWeather), Some("OW"));
        assert_eq!(loaded.cache.redis_url.as_deref(), Some("redis://cache:6379/0"));
    }

    #[test]
    fn storing_a_key_does_not_persist_env_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut existing = Config::default();
        existing.upsert_provider_api_key(ProviderId::HereMaps, "HERE_FILE".into());
        existing.save_to(&path).unwrap();

        // SAFETY: no other test reads this variable from the process environment.
        unsafe { std::env::set_var("OPENWEATHER_API_KEY", "SECRET_FROM_ENV") };
        let stored = Config::store_provider_api_key(&path, ProviderId::Mapbox, "MB".into());
        unsafe { std::env::remove_var("OPENWEATHER_API_KEY") };
        stored.unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("SECRET_FROM_ENV"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.provider_api_key(ProviderId::Mapbox), Some("MB"));
        assert_eq!(loaded.provider_api_key(ProviderId::HereMaps), Some("HERE_FILE"));
        assert!(!loaded.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.providers.is_empty());
    }
}
