//! CoinGecko-backed cryptocurrency history and coin directory.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::CachedClient;
use crate::decode;
use crate::error::{MarketError, Result};
use crate::history::HistoryPoint;
use crate::providers::{DIRECTORY_TTL_SECS, SHORT_TTL_SECS};

pub struct CoinGeckoProvider {
    base_url: String,
    api_key: Option<String>,
    client: Arc<CachedClient>,
    /// Display name to API identifier, loaded at most once per process.
    directory: Mutex<Option<Arc<HashMap<String, String>>>>,
    /// Decoded history per coin, never expired within a run.
    history: Mutex<HashMap<String, Arc<Vec<HistoryPoint>>>>,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, api_key: Option<&str>, client: Arc<CachedClient>) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
            client,
            directory: Mutex::new(None),
            history: Mutex::new(HashMap::new()),
        }
    }

    fn directory_url(&self) -> String {
        let mut url = format!("{}/api/v3/coins/list", self.base_url);
        if let Some(key) = &self.api_key {
            url.push_str(&format!("?x_cg_demo_api_key={key}"));
        }
        url
    }

    // The free tier serves relative windows only, so per-coin history is one
    // rolling 365-day request rather than date-chunked fetches.
    fn history_url(&self, id: &str) -> String {
        let mut url = format!(
            "{}/api/v3/coins/{}/market_chart?vs_currency=usd&days=365&interval=daily",
            self.base_url, id
        );
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&x_cg_demo_api_key={key}"));
        }
        url
    }

    /// The name-to-identifier directory of available coins.
    pub async fn directory(&self) -> Result<Arc<HashMap<String, String>>> {
        let mut slot = self.directory.lock().await;
        if let Some(directory) = slot.as_ref() {
            return Ok(Arc::clone(directory));
        }

        let response = self.client.get(&self.directory_url(), DIRECTORY_TTL_SECS).await?;
        let directory = Arc::new(decode::coin_directory(response.response())?);
        debug!("Coin directory loaded with {} entries", directory.len());

        *slot = Some(Arc::clone(&directory));
        Ok(directory)
    }

    /// A year of daily samples for the coin named `name`, decoded at most
    /// once per process.
    pub async fn history(&self, name: &str) -> Result<Arc<Vec<HistoryPoint>>> {
        let mut cache = self.history.lock().await;
        if let Some(points) = cache.get(name) {
            return Ok(Arc::clone(points));
        }

        let id = self
            .directory()
            .await?
            .get(name)
            .cloned()
            .ok_or_else(|| MarketError::UnknownItem(name.to_string()))?;

        let response = self.client.get(&self.history_url(&id), SHORT_TTL_SECS).await?;
        let points = Arc::new(decode::crypto_history(response.response())?);

        cache.insert(name.to_string(), Arc::clone(&points));
        Ok(points)
    }
}
