use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{CachedResponse, DiskStore};
use crate::error::Result;
use crate::net::Fetch;

/// Max age encoding "never refetch", for history chunks fully settled in the
/// past.
pub const NEVER_EXPIRE: u64 = u64::MAX;

/// Get-or-fetch-and-store primitive keyed by request URL.
pub struct CachedClient {
    store: DiskStore,
    fetch: Arc<dyn Fetch>,
}

impl CachedClient {
    pub fn new(store: DiskStore, fetch: Arc<dyn Fetch>) -> Self {
        Self { store, fetch }
    }

    /// Returns the response for `url`, served from disk when a valid entry
    /// younger than `max_age_secs` exists, otherwise fetched and persisted.
    ///
    /// A fetch failure propagates without writing, leaving any previous
    /// entry intact for a later retry. A failed disk write after a
    /// successful fetch is logged and the fresh response returned anyway.
    pub async fn get(&self, url: &str, max_age_secs: u64) -> Result<CachedResponse> {
        let now = Utc::now().timestamp_millis();

        if let Some(cached) = self.read_fresh(url, now, max_age_secs) {
            debug!(
                "Cache hit, response from {}s ago for {}",
                (now - cached.time()) / 1000,
                url
            );
            return Ok(cached);
        }

        debug!("Cache miss, fetching {}", url);
        let body = self.fetch.get(url).await?;
        let entry = CachedResponse::new(now, body);

        if let Err(e) = self.store.write(url, &entry) {
            warn!("Failed to persist response for {}: {}", url, e);
        }

        Ok(entry)
    }

    /// The stored entry for `key` when present, well-formed and not older
    /// than `max_age_secs`.
    fn read_fresh(&self, key: &str, now: i64, max_age_secs: u64) -> Option<CachedResponse> {
        let entry = self.store.read(key)?;

        if !entry.is_valid() {
            return None;
        }

        let age_ms = now - entry.time();
        let max_ms = max_age_secs.saturating_mul(1000).min(i64::MAX as u64) as i64;
        if age_ms > max_ms {
            return None;
        }

        Some(entry)
    }
}
