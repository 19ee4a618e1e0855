use crate::core::catalog::DEFAULT_CATALOG_TTL_SECS;
use crate::core::market_cache::DEFAULT_MARKET_TTL_SECS;
use crate::providers::coingecko::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CoinGeckoProviderConfig {
    fn default() -> Self {
        CoinGeckoProviderConfig {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub coingecko: CoinGeckoProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_market_ttl")]
    pub market_ttl_secs: i64,
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: i64,
}

fn default_market_ttl() -> i64 {
    DEFAULT_MARKET_TTL_SECS
}

fn default_catalog_ttl() -> i64 {
    DEFAULT_CATALOG_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            market_ttl_secs: DEFAULT_MARKET_TTL_SECS,
            catalog_ttl_secs: DEFAULT_CATALOG_TTL_SECS,
        }
    }
}

fn default_vs_currency() -> String {
    "usd".to_string()
}

fn default_change_windows() -> Vec<String> {
    vec!["24h".to_string(), "7d".to_string()]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    #[serde(default = "default_change_windows")]
    pub price_change_windows: Vec<String>,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            cache: CacheConfig::default(),
            vs_currency: default_vs_currency(),
            price_change_windows: default_change_windows(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinwatch", "coinwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "coinwatch", "coinwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("portfolio"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
