//! Decoders from raw API payloads to typed records. Pure parsing with no
//! cache or network dependency.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{MarketError, Result};
use crate::history::{HistoryPoint, PRICE, VOLUME, day_start_ms};

fn decode_err(context: &'static str, error: impl std::fmt::Display) -> MarketError {
    MarketError::Decode {
        context,
        message: error.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<(i64, f64)>,
    total_volumes: Vec<(i64, f64)>,
}

/// Decodes a CoinGecko market-chart payload into combined price/volume
/// samples. The two arrays are positionally aligned by the API.
pub fn crypto_history(json: &str) -> Result<Vec<HistoryPoint>> {
    let chart: MarketChart =
        serde_json::from_str(json).map_err(|e| decode_err("crypto market chart", e))?;

    Ok(chart
        .prices
        .into_iter()
        .zip(chart.total_volumes)
        .map(|((timestamp_ms, price), (_, volume))| {
            HistoryPoint::new(
                timestamp_ms,
                HashMap::from([(PRICE.to_string(), price), (VOLUME.to_string(), volume)]),
            )
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct DayQuotes {
    metals: HashMap<String, f64>,
}

/// Decodes a metals timeseries payload, keyed by ISO date, into one sample
/// per date with one field per metal. Timestamps are start of day UTC.
pub fn metal_history(json: &str) -> Result<Vec<HistoryPoint>> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| decode_err("metal timeseries", e))?;

    // An empty window comes back without a rates object; that is data, not
    // a contract violation.
    let Some(rates) = value.get("rates").and_then(|rates| rates.as_object()) else {
        return Ok(Vec::new());
    };

    let mut points = Vec::with_capacity(rates.len());
    for (date, day) in rates {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| decode_err("metal timeseries date", format!("{date:?}: {e}")))?;
        let quotes: DayQuotes = serde_json::from_value(day.clone())
            .map_err(|e| decode_err("metal timeseries rates", e))?;

        points.push(HistoryPoint::new(day_start_ms(date), quotes.metals));
    }

    Ok(points)
}

#[derive(Debug, Deserialize)]
struct MetalSnapshot {
    metals: HashMap<String, f64>,
}

/// Decodes a metals latest-quotes payload into one quote per metal.
pub fn metal_current(json: &str) -> Result<HashMap<String, f64>> {
    let snapshot: MetalSnapshot =
        serde_json::from_str(json).map_err(|e| decode_err("metal snapshot", e))?;
    Ok(snapshot.metals)
}

#[derive(Debug, Deserialize)]
struct RateTable {
    currencies: HashMap<String, f64>,
}

/// Decodes an exchange-rate table payload, keeping only the wanted codes.
pub fn exchange_rates(json: &str, wanted: &[String]) -> Result<HashMap<String, f64>> {
    let table: RateTable =
        serde_json::from_str(json).map_err(|e| decode_err("exchange rate table", e))?;

    Ok(wanted
        .iter()
        .filter_map(|code| table.currencies.get(code).map(|rate| (code.clone(), *rate)))
        .collect())
}

#[derive(Debug, Deserialize)]
struct Coin {
    id: String,
    name: String,
}

/// Decodes the coin directory into a display-name to API-identifier map.
pub fn coin_directory(json: &str) -> Result<HashMap<String, String>> {
    let coins: Vec<Coin> =
        serde_json::from_str(json).map_err(|e| decode_err("coin directory", e))?;
    Ok(coins.into_iter().map(|coin| (coin.name, coin.id)).collect())
}
