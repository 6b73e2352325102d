//! HTTP transport seam between the cache layer and the real network.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{MarketError, Result};

/// Minimal GET contract the cache layer depends on. Implementations return
/// the body of a 200 response and an error for anything else.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

/// `reqwest`-backed transport.
///
/// Transport-level failures are retried a few times; a non-200 status is an
/// answer, not a fault, and is returned immediately.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mkthist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketError::Network {
                status: None,
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn get(&self, url: &str) -> Result<String> {
        let response = with_retry(
            || async {
                self.client
                    .get(url)
                    .header("accept", "application/json")
                    .send()
                    .await
            },
            3,
            500,
        )
        .await
        .map_err(|e| MarketError::Network {
            status: None,
            message: format!("{e} for {url}"),
        })?;

        let status = response.status();
        debug!(
            "{} {} for {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status"),
            url
        );

        if status != reqwest::StatusCode::OK {
            return Err(MarketError::Network {
                status: Some(status.as_u16()),
                message: format!(
                    "{} {} for {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("unknown status"),
                    url
                ),
            });
        }

        response.text().await.map_err(|e| MarketError::Network {
            status: None,
            message: format!("failed to read body: {e} for {url}"),
        })
    }
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> std::result::Result<T, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
