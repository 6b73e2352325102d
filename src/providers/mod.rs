//! Per-domain data providers: each owns its cache keys, TTL policy and
//! decoded in-memory cache, on top of the shared disk-backed client.

pub mod coingecko;
pub mod metals_dev;
pub mod rates;

/// TTL for anything tracking a moving target: unsettled history chunks,
/// current-day quotes, the exchange-rate table.
pub const SHORT_TTL_SECS: u64 = 12 * 60 * 60;

/// TTL for the coin directory, which changes rarely.
pub const DIRECTORY_TTL_SECS: u64 = 24 * 60 * 60;
