use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        CoinGeckoConfig {
            base_url: "https://api.coingecko.com".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetalsDevConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for MetalsDevConfig {
    fn default() -> Self {
        MetalsDevConfig {
            base_url: "https://api.metals.dev".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub coingecko: CoinGeckoConfig,
    #[serde(default)]
    pub metals_dev: MetalsDevConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Currency charted values are converted into.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Crypto watchlist used when no items are passed on the command line.
    #[serde(default = "default_cryptocurrencies")]
    pub cryptocurrencies: Vec<String>,

    /// Metal watchlist used when no items are passed on the command line.
    #[serde(default = "default_metals")]
    pub metals: Vec<String>,

    /// Currency codes kept when the exchange-rate table is decoded.
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,

    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Overrides the XDG cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            cryptocurrencies: default_cryptocurrencies(),
            metals: default_metals(),
            currencies: default_currencies(),
            providers: ProvidersConfig::default(),
            cache_dir: None,
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_cryptocurrencies() -> Vec<String> {
    [
        "Bitcoin", "Cardano", "Chainlink", "Dogecoin", "Ethereum", "Litecoin", "Monero",
        "Polkadot", "XRP", "Solana",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_metals() -> Vec<String> {
    ["Gold", "Palladium", "Platinum", "Silver"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn default_currencies() -> Vec<String> {
    [
        "AUD", "BRL", "CAD", "CHF", "CNY", "EUR", "GBP", "JPY", "SEK", "USD",
    ]
    .iter()
    .map(|code| code.to_string())
    .collect()
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "mkthist")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
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
