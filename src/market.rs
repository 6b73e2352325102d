//! Orchestrator facade tying providers, exchange rates and assembly
//! together behind one request surface.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::assemble;
use crate::cache::{CachedClient, DiskStore};
use crate::config::AppConfig;
use crate::error::Result;
use crate::history::{HistoryResponse, ValueKind};
use crate::net::{Fetch, HttpClient};
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::metals_dev::MetalsDevProvider;
use crate::providers::rates::ExchangeRates;

/// Data categories with their own decoder and TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Crypto,
    Metal,
}

pub struct MarketData {
    crypto: CoinGeckoProvider,
    metals: MetalsDevProvider,
    rates: ExchangeRates,
}

impl MarketData {
    /// Wires all providers against one shared fetcher and disk cache.
    pub fn new(config: &AppConfig, store: DiskStore, fetch: Arc<dyn Fetch>) -> Self {
        let client = Arc::new(CachedClient::new(store, fetch));
        let coingecko = &config.providers.coingecko;
        let metals_dev = &config.providers.metals_dev;

        Self {
            crypto: CoinGeckoProvider::new(
                &coingecko.base_url,
                coingecko.api_key.as_deref(),
                Arc::clone(&client),
            ),
            metals: MetalsDevProvider::new(
                &metals_dev.base_url,
                &metals_dev.api_key,
                Arc::clone(&client),
            ),
            rates: ExchangeRates::new(
                &metals_dev.base_url,
                &metals_dev.api_key,
                &config.currencies,
                client,
            ),
        }
    }

    /// Convenience constructor over the real transport and the configured
    /// (or default XDG) cache directory.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let root = config
            .cache_dir
            .clone()
            .or_else(DiskStore::default_root)
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no cache directory available",
                )
            })?;

        Ok(Self::new(
            config,
            DiskStore::new(root),
            Arc::new(HttpClient::new()?),
        ))
    }

    /// History for `items` over `[start, end]`, projected per `kind` and
    /// converted into `currency`.
    ///
    /// Items with no samples inside the window are dropped from `series` and
    /// reported in `missing`; the first network or decode failure aborts the
    /// whole range query. Failures never cross domains because each domain
    /// is queried separately.
    pub async fn historical_series(
        &self,
        domain: Domain,
        items: &[String],
        start: NaiveDate,
        end: NaiveDate,
        currency: &str,
        kind: ValueKind,
    ) -> Result<HistoryResponse> {
        let rate = self.rates.rate(currency).await?;
        let (start_ms, end_ms) = assemble::window_ms(start, end);

        let mut response = HistoryResponse::default();
        if items.is_empty() {
            return Ok(response);
        }

        match domain {
            Domain::Crypto => {
                // Traded volume is a unit count, not a currency amount; only
                // prices are converted.
                let convert = kind == ValueKind::Price;
                for item in items {
                    let points = self.crypto.history(item).await?;
                    let series =
                        assemble::project(&points, kind.field(), start_ms, end_ms, rate, convert);
                    response.push(item, series);
                }
            }
            Domain::Metal => {
                let today = Utc::now().date_naive();
                let points = self.metals.range(start, end, today).await?;
                for item in items {
                    let series = assemble::project(
                        &points,
                        &item.to_lowercase(),
                        start_ms,
                        end_ms,
                        rate,
                        true,
                    );
                    response.push(item, series);
                }
            }
        }

        Ok(response)
    }

    /// Exchange rate for `code` against the USD base.
    pub async fn exchange_rate(&self, code: &str) -> Result<f64> {
        self.rates.rate(code).await
    }

    /// Display-name to API-identifier directory of available coins.
    pub async fn available_coins(&self) -> Result<Arc<HashMap<String, String>>> {
        self.crypto.directory().await
    }
}
