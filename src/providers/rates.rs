//! Exchange rates against the USD base, loaded as one table per process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::CachedClient;
use crate::decode;
use crate::error::{MarketError, Result};
use crate::providers::SHORT_TTL_SECS;

/// Reference unit all rates are expressed against.
pub const BASE_CURRENCY: &str = "USD";

pub struct ExchangeRates {
    base_url: String,
    api_key: String,
    /// Codes kept when the table payload is decoded.
    currencies: Vec<String>,
    client: Arc<CachedClient>,
    table: Mutex<RateTable>,
}

#[derive(Default)]
struct RateTable {
    loaded: bool,
    rates: HashMap<String, f64>,
}

impl ExchangeRates {
    pub fn new(
        base_url: &str,
        api_key: &str,
        currencies: &[String],
        client: Arc<CachedClient>,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            currencies: currencies.to_vec(),
            client,
            table: Mutex::new(RateTable::default()),
        }
    }

    fn currencies_url(&self) -> String {
        format!(
            "{}/v1/currencies?api_key={}&base={}",
            self.base_url, self.api_key, BASE_CURRENCY
        )
    }

    /// Rate for `currency` against the USD base.
    ///
    /// The base currency is always 1.0 and never triggers a fetch. Any other
    /// code loads the full table at most once per process; codes absent from
    /// the loaded table resolve to `MissingRate` without another fetch. A
    /// failed load leaves the table unloaded so a later call can retry.
    pub async fn rate(&self, currency: &str) -> Result<f64> {
        if currency == BASE_CURRENCY {
            return Ok(1.0);
        }

        let mut table = self.table.lock().await;
        if !table.loaded {
            let response = self.client.get(&self.currencies_url(), SHORT_TTL_SECS).await?;
            table.rates = decode::exchange_rates(response.response(), &self.currencies)?;
            table.loaded = true;
            debug!("Exchange rate table loaded with {} entries", table.rates.len());
        }

        table
            .rates
            .get(currency)
            .copied()
            .ok_or_else(|| MarketError::MissingRate(currency.to_string()))
    }
}
