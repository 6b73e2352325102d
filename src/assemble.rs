//! Turns concatenated raw history into caller-ready chart series.

use chrono::NaiveDate;

use crate::history::{ChartPoint, HistoryPoint, day_start_ms};

/// Inclusive window bounds: the start-of-day UTC instant of both dates.
pub fn window_ms(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    (day_start_ms(start), day_start_ms(end))
}

/// Projects `field` from the points inside `[start_ms, end_ms]`, dividing by
/// `rate` when `convert` is set (prices and metal quotes are
/// currency-denominated, traded volume is not), and sorts ascending.
///
/// Points lacking `field` are skipped. Chunk concatenation order is not
/// trusted: samples arrive interleaved across the current-day snapshot and
/// per-chunk responses.
pub fn project(
    points: &[HistoryPoint],
    field: &str,
    start_ms: i64,
    end_ms: i64,
    rate: f64,
    convert: bool,
) -> Vec<ChartPoint> {
    let mut series: Vec<ChartPoint> = points
        .iter()
        .filter(|point| point.timestamp_ms >= start_ms && point.timestamp_ms <= end_ms)
        .filter_map(|point| {
            point.value(field).map(|value| ChartPoint {
                timestamp_ms: point.timestamp_ms,
                value: if convert { value / rate } else { value },
            })
        })
        .collect();

    series.sort_by_key(|point| point.timestamp_ms);
    series
}
