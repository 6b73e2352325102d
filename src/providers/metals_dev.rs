//! metals.dev-backed precious metal history, assembled from fixed 30-day
//! chunks so repeated range queries mostly land on the disk cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::cache::{CachedClient, NEVER_EXPIRE};
use crate::chunk;
use crate::decode;
use crate::error::Result;
use crate::history::{HistoryPoint, day_start_ms};
use crate::providers::SHORT_TTL_SECS;

/// Chunk width in days for metal history cache keys.
pub const CHUNK_DAYS: u32 = 30;

/// Request date format used by the metals.dev API.
const API_DATE_FORMAT: &str = "%Y.%m.%d";

pub struct MetalsDevProvider {
    base_url: String,
    api_key: String,
    client: Arc<CachedClient>,
    /// Decoded samples per chunk index (sentinel included), never expired
    /// within a run.
    history: Mutex<HashMap<i32, Arc<Vec<HistoryPoint>>>>,
}

impl MetalsDevProvider {
    pub fn new(base_url: &str, api_key: &str, client: Arc<CachedClient>) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            client,
            history: Mutex::new(HashMap::new()),
        }
    }

    fn latest_url(&self) -> String {
        format!("{}/v1/latest?api_key={}", self.base_url, self.api_key)
    }

    fn timeseries_url(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v1/timeseries?api_key={}&start_date={}&end_date={}",
            self.base_url,
            self.api_key,
            start.format(API_DATE_FORMAT),
            end.format(API_DATE_FORMAT)
        )
    }

    /// All samples covering `[start, end]`, concatenated current-day first
    /// and then in ascending chunk order, unsorted within the whole. The
    /// caller windows and sorts the result.
    ///
    /// `today` is passed in rather than read from the clock so the
    /// current-day branch stays deterministic under test.
    pub async fn range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<HistoryPoint>> {
        let start_chunk = chunk::index_of(start, CHUNK_DAYS);
        let mut end_chunk = chunk::index_of(end, CHUNK_DAYS);

        let mut points = Vec::new();

        // History responses never include the current day; it has its own
        // endpoint, cache key and TTL.
        if end == today {
            points.extend(self.current(today).await?.iter().cloned());

            // Drop the last chunk entirely when today is its only member.
            if today == chunk::start_of(end_chunk, CHUNK_DAYS) {
                end_chunk -= 1;
            }
        }

        for index in start_chunk..=end_chunk {
            points.extend(self.chunk(index, today).await?.iter().cloned());
        }

        Ok(points)
    }

    /// Current-day snapshot, cached under the sentinel chunk key.
    async fn current(&self, today: NaiveDate) -> Result<Arc<Vec<HistoryPoint>>> {
        let mut cache = self.history.lock().await;
        if let Some(points) = cache.get(&chunk::CURRENT_CHUNK) {
            return Ok(Arc::clone(points));
        }

        let response = self.client.get(&self.latest_url(), SHORT_TTL_SECS).await?;
        let quotes = decode::metal_current(response.response())?;
        let points = Arc::new(vec![HistoryPoint::new(day_start_ms(today), quotes)]);

        cache.insert(chunk::CURRENT_CHUNK, Arc::clone(&points));
        Ok(points)
    }

    async fn chunk(&self, index: i32, today: NaiveDate) -> Result<Arc<Vec<HistoryPoint>>> {
        let mut cache = self.history.lock().await;
        if let Some(points) = cache.get(&index) {
            return Ok(Arc::clone(points));
        }

        let chunk_start = chunk::start_of(index, CHUNK_DAYS);
        let chunk_end = chunk::end_of(index, CHUNK_DAYS);
        let yesterday = today.pred_opt().unwrap_or(today);

        // Never request the future or today; today is served by `current`.
        let request_end = chunk_end.min(yesterday);

        // A chunk fully settled in the past cannot change, so its cached
        // response never expires. The open-ended last chunk keeps the short
        // TTL until it settles.
        let max_age = if chunk_end < yesterday {
            NEVER_EXPIRE
        } else {
            SHORT_TTL_SECS
        };

        let response = self
            .client
            .get(&self.timeseries_url(chunk_start, request_end), max_age)
            .await?;
        let points = Arc::new(decode::metal_history(response.response())?);

        cache.insert(index, Arc::clone(&points));
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiskStore;
    use crate::net::HttpClient;
    use chrono::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LATEST: &str = r#"{"metals": {"gold": 2650.0, "silver": 31.0}}"#;
    const EMPTY_SERIES: &str = r#"{"rates": {}}"#;

    async fn create_provider(server: &MockServer) -> (MetalsDevProvider, TempDir) {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(CachedClient::new(
            DiskStore::new(dir.path()),
            Arc::new(HttpClient::new().unwrap()),
        ));
        (MetalsDevProvider::new(&server.uri(), "test", client), dir)
    }

    #[tokio::test]
    async fn test_range_ending_today_adds_exactly_one_latest_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/timeseries"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_SERIES))
            .mount(&server)
            .await;

        // A today well inside a chunk, so the chunked path runs too.
        let today = chunk::start_of(300, CHUNK_DAYS) + Duration::days(10);
        let start = today - Duration::days(5);

        let (provider, _dir) = create_provider(&server).await;
        let points = provider.range(start, today, today).await.unwrap();

        // The snapshot contributes today's single point, first.
        assert_eq!(points[0].timestamp_ms, day_start_ms(today));
        assert_eq!(points[0].value("gold"), Some(2650.0));
    }

    #[tokio::test]
    async fn test_today_as_sole_chunk_member_skips_its_chunk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST))
            .expect(1)
            .mount(&server)
            .await;
        // No timeseries mock: any chunk request would 404 and fail the test.

        let today = chunk::start_of(300, CHUNK_DAYS);
        let (provider, _dir) = create_provider(&server).await;

        let points = provider.range(today, today, today).await.unwrap();
        assert_eq!(points.len(), 1);
    }

    #[tokio::test]
    async fn test_end_chunk_request_is_clamped_to_yesterday() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST))
            .mount(&server)
            .await;

        let today = chunk::start_of(300, CHUNK_DAYS) + Duration::days(10);
        let yesterday = today - Duration::days(1);
        Mock::given(method("GET"))
            .and(path("/v1/timeseries"))
            .and(query_param(
                "start_date",
                chunk::start_of(300, CHUNK_DAYS)
                    .format("%Y.%m.%d")
                    .to_string(),
            ))
            .and(query_param("end_date", yesterday.format("%Y.%m.%d").to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_SERIES))
            .expect(1)
            .mount(&server)
            .await;

        let (provider, _dir) = create_provider(&server).await;
        provider
            .range(today - Duration::days(5), today, today)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_settled_chunks_are_cached_across_provider_instances() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/timeseries"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"rates": {"2024-09-05": {"metals": {"gold": 2492.3}}}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        // A range far in the past, entirely inside one settled chunk.
        let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 9, 15).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();

        let dir = TempDir::new().unwrap();
        for _ in 0..2 {
            // Fresh provider each time: only the disk cache persists.
            let client = Arc::new(CachedClient::new(
                DiskStore::new(dir.path()),
                Arc::new(HttpClient::new().unwrap()),
            ));
            let provider = MetalsDevProvider::new(&server.uri(), "test", client);
            let points = provider.range(start, end, today).await.unwrap();
            assert_eq!(points.len(), 1);
        }
    }
}
