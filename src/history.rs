//! Carrier types for decoded market history.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

/// Field name for a price sample.
pub const PRICE: &str = "price";

/// Field name for a traded-volume sample.
pub const VOLUME: &str = "volume";

/// One time sample of one or more named numeric fields: price and volume for
/// a coin, or one quote per metal. Field names are lowercase. Immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub timestamp_ms: i64,
    values: HashMap<String, f64>,
}

impl HistoryPoint {
    pub fn new(timestamp_ms: i64, values: HashMap<String, f64>) -> Self {
        Self {
            timestamp_ms,
            values,
        }
    }

    /// The sample's value for `field`, if the source carried that field.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }
}

/// One projected, currency-adjusted sample of a chart series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Which numeric field of a crypto sample is charted. Metals always chart
/// the per-metal quote and treat it like a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Price,
    Volume,
}

impl ValueKind {
    pub fn field(&self) -> &'static str {
        match self {
            ValueKind::Price => PRICE,
            ValueKind::Volume => VOLUME,
        }
    }
}

/// Per-item chart series for one range query. Items whose series came out
/// empty after windowing are listed in `missing` instead; other items in the
/// same request still succeed.
#[derive(Debug, Default)]
pub struct HistoryResponse {
    pub series: HashMap<String, Vec<ChartPoint>>,
    pub missing: Vec<String>,
}

impl HistoryResponse {
    pub fn push(&mut self, item: &str, series: Vec<ChartPoint>) {
        if series.is_empty() {
            self.missing.push(item.to_string());
        } else {
            self.series.insert(item.to_string(), series);
        }
    }

    pub fn merge(&mut self, other: HistoryResponse) {
        self.series.extend(other.series);
        self.missing.extend(other.missing);
    }
}

/// Start-of-day instant in UTC for a calendar date, in epoch millis.
pub fn day_start_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
