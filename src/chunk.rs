//! Groups calendar days into fixed-size chunks used as history cache keys.

use chrono::{Duration, NaiveDate};

/// Reserved chunk index for "current day" data, which is always in flux and
/// cannot be cached under the normal chunk scheme.
pub const CURRENT_CHUNK: i32 = i32::MAX;

/// Anchor date for chunk index 0. Chunk boundaries must not move between
/// runs, otherwise previously cached chunks become unreachable.
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid anchor date")
}

/// Chunk index containing `date` for chunks of `size` days.
///
/// Euclidean division keeps the bucketing correct on both sides of the
/// anchor: dates before it get negative indices instead of collapsing into
/// chunk 0.
pub fn index_of(date: NaiveDate, size: u32) -> i32 {
    let days = date.signed_duration_since(epoch()).num_days();
    days.div_euclid(i64::from(size)) as i32
}

/// First date of `chunk`.
pub fn start_of(chunk: i32, size: u32) -> NaiveDate {
    epoch() + Duration::days(i64::from(chunk) * i64::from(size))
}

/// Last date of `chunk`, inclusive.
pub fn end_of(chunk: i32, size: u32) -> NaiveDate {
    epoch() + Duration::days((i64::from(chunk) + 1) * i64::from(size) - 1)
}
