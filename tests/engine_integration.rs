use std::path::Path;

use chrono::{Duration, NaiveDate, Utc};
use mkthist::config::AppConfig;
use mkthist::error::MarketError;
use mkthist::history::{ValueKind, day_start_ms};
use mkthist::market::{Domain, MarketData};
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_timeseries(server: &MockServer, start_date: &str, body: &str, expect: u64) {
        Mock::given(method("GET"))
            .and(path("/v1/timeseries"))
            .and(query_param("start_date", start_date))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expect)
            .mount(server)
            .await;
    }

    pub async fn mount_latest(server: &MockServer, body: &str, expect: u64) {
        Mock::given(method("GET"))
            .and(path("/v1/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expect)
            .mount(server)
            .await;
    }

    pub async fn mount_currencies(server: &MockServer, body: &str, expect: u64) {
        Mock::given(method("GET"))
            .and(path("/v1/currencies"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expect)
            .mount(server)
            .await;
    }

    pub fn rates_body(dates_and_gold: &[(&str, f64)]) -> String {
        let entries: Vec<String> = dates_and_gold
            .iter()
            .map(|(date, gold)| {
                format!(r#""{date}": {{"metals": {{"gold": {gold}, "silver": 30.0}}}}"#)
            })
            .collect();
        format!(r#"{{"rates": {{{}}}}}"#, entries.join(","))
    }
}

fn test_config(server_uri: &str, cache_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.providers.coingecko.base_url = server_uri.to_string();
    config.providers.metals_dev.base_url = server_uri.to_string();
    config.providers.metals_dev.api_key = "test".to_string();
    config.cache_dir = Some(cache_dir.to_path_buf());
    config
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn gold() -> Vec<String> {
    vec!["Gold".to_string()]
}

// Chunk layout around September 2024 (size 30, anchored 2000-01-01):
//   chunk 299: 2024-07-23 ..= 2024-08-21
//   chunk 300: 2024-08-22 ..= 2024-09-20
//   chunk 301: 2024-09-21 ..= 2024-10-20
#[test_log::test(tokio::test)]
async fn test_three_chunk_range_fetches_only_uncached_chunks() {
    let server = wiremock::MockServer::start().await;

    test_utils::mount_timeseries(
        &server,
        "2024.07.23",
        &test_utils::rates_body(&[("2024-07-25", 2400.0), ("2024-08-05", 2410.0)]),
        1,
    )
    .await;
    test_utils::mount_timeseries(
        &server,
        "2024.08.22",
        &test_utils::rates_body(&[("2024-09-05", 2492.3)]),
        1,
    )
    .await;
    test_utils::mount_timeseries(
        &server,
        "2024.09.21",
        &test_utils::rates_body(&[("2024-09-25", 2520.0), ("2024-10-10", 2605.9)]),
        1,
    )
    .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), cache_dir.path());

    // Warm the middle chunk only.
    let market = MarketData::from_config(&config).unwrap();
    let warm = market
        .historical_series(
            Domain::Metal,
            &gold(),
            date(2024, 8, 25),
            date(2024, 9, 10),
            "USD",
            ValueKind::Price,
        )
        .await
        .unwrap();
    assert_eq!(warm.series["Gold"].len(), 1);

    // A fresh engine over the same disk cache: only the two uncached chunks
    // may be fetched, and the merged series spans all three.
    let market = MarketData::from_config(&config).unwrap();
    let response = market
        .historical_series(
            Domain::Metal,
            &gold(),
            date(2024, 8, 1),
            date(2024, 10, 5),
            "USD",
            ValueKind::Price,
        )
        .await
        .unwrap();

    let series = &response.series["Gold"];
    let timestamps: Vec<i64> = series.iter().map(|p| p.timestamp_ms).collect();
    assert_eq!(
        timestamps,
        vec![
            day_start_ms(date(2024, 8, 5)),
            day_start_ms(date(2024, 9, 5)),
            day_start_ms(date(2024, 9, 25)),
            day_start_ms(date(2024, 10, 10)),
        ],
        "merged series must cover all three chunks, windowed and ascending"
    );

    // USD is the base currency; the rate table must never be requested.
    let currency_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/v1/currencies")
        .count();
    assert_eq!(currency_requests, 0);
}

#[test_log::test(tokio::test)]
async fn test_gold_september_window_is_one_fetch_windowed_and_sorted() {
    let server = wiremock::MockServer::start().await;

    // Deliberately unordered, with samples outside the requested window.
    test_utils::mount_timeseries(
        &server,
        "2024.08.22",
        &test_utils::rates_body(&[
            ("2024-09-10", 2510.0),
            ("2024-08-25", 2480.0),
            ("2024-09-05", 2492.3),
            ("2024-09-20", 2530.0),
        ]),
        1,
    )
    .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), cache_dir.path());
    let market = MarketData::from_config(&config).unwrap();

    let response = market
        .historical_series(
            Domain::Metal,
            &gold(),
            date(2024, 9, 1),
            date(2024, 9, 15),
            "USD",
            ValueKind::Price,
        )
        .await
        .unwrap();

    let series = &response.series["Gold"];
    info!(?series, "Windowed September series");
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].timestamp_ms, day_start_ms(date(2024, 9, 5)));
    assert_eq!(series[0].value, 2492.3);
    assert_eq!(series[1].timestamp_ms, day_start_ms(date(2024, 9, 10)));

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_range_ending_today_adds_current_value_fetch() {
    let server = wiremock::MockServer::start().await;
    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);

    test_utils::mount_latest(&server, r#"{"metals": {"gold": 2650.0}}"#, 1).await;

    // Catch-all chunk mock carrying yesterday's close; depending on where
    // today falls in its chunk the engine may skip chunk fetches entirely.
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/v1/timeseries"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
            test_utils::rates_body(&[(&yesterday.format("%Y-%m-%d").to_string(), 2640.0)]),
        ))
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), cache_dir.path());
    let market = MarketData::from_config(&config).unwrap();

    let response = market
        .historical_series(
            Domain::Metal,
            &gold(),
            today - Duration::days(5),
            today,
            "USD",
            ValueKind::Price,
        )
        .await
        .unwrap();

    let series = &response.series["Gold"];
    assert_eq!(
        series.last().unwrap().timestamp_ms,
        day_start_ms(today),
        "the current day must come from the latest-quotes endpoint"
    );
    assert_eq!(series.last().unwrap().value, 2650.0);

    let latest_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/v1/latest")
        .count();
    assert_eq!(latest_requests, 1);
}

#[test_log::test(tokio::test)]
async fn test_crypto_history_converts_prices_but_not_volumes() {
    let server = wiremock::MockServer::start().await;

    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/v3/coins/list"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
            r#"[{"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let start = date(2024, 10, 1);
    let chart = format!(
        r#"{{
            "prices": [[{ts1}, 64000.0], [{ts2}, 66000.0]],
            "total_volumes": [[{ts1}, 2.0e10], [{ts2}, 3.0e10]]
        }}"#,
        ts1 = day_start_ms(start),
        ts2 = day_start_ms(start + Duration::days(1)),
    );
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/v3/coins/bitcoin/market_chart"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(&chart))
        .expect(1)
        .mount(&server)
        .await;
    test_utils::mount_currencies(&server, r#"{"currencies": {"EUR": 2.0}}"#, 1).await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), cache_dir.path());
    let market = MarketData::from_config(&config).unwrap();
    let bitcoin = vec!["Bitcoin".to_string()];

    let prices = market
        .historical_series(
            Domain::Crypto,
            &bitcoin,
            start,
            start + Duration::days(1),
            "EUR",
            ValueKind::Price,
        )
        .await
        .unwrap();
    assert_eq!(prices.series["Bitcoin"][0].value, 32000.0);

    // Same process: coin list, chart and rate table are all served from
    // memory; volume values stay unconverted.
    let volumes = market
        .historical_series(
            Domain::Crypto,
            &bitcoin,
            start,
            start + Duration::days(1),
            "EUR",
            ValueKind::Volume,
        )
        .await
        .unwrap();
    assert_eq!(volumes.series["Bitcoin"][0].value, 2.0e10);
}

#[test_log::test(tokio::test)]
async fn test_no_data_for_interval_is_reported_per_item() {
    let server = wiremock::MockServer::start().await;

    // Gold has samples, palladium never appears in the payload.
    test_utils::mount_timeseries(
        &server,
        "2024.08.22",
        &test_utils::rates_body(&[("2024-09-05", 2492.3)]),
        1,
    )
    .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), cache_dir.path());
    let market = MarketData::from_config(&config).unwrap();

    let response = market
        .historical_series(
            Domain::Metal,
            &["Gold".to_string(), "Palladium".to_string()],
            date(2024, 9, 1),
            date(2024, 9, 15),
            "USD",
            ValueKind::Price,
        )
        .await
        .unwrap();

    assert!(response.series.contains_key("Gold"));
    assert!(!response.series.contains_key("Palladium"));
    assert_eq!(response.missing, vec!["Palladium".to_string()]);
}

#[test_log::test(tokio::test)]
async fn test_crypto_failure_does_not_block_metal_results() {
    let server = wiremock::MockServer::start().await;

    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/api/v3/coins/list"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&server)
        .await;
    test_utils::mount_timeseries(
        &server,
        "2024.08.22",
        &test_utils::rates_body(&[("2024-09-05", 2492.3)]),
        1,
    )
    .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), cache_dir.path());
    let market = MarketData::from_config(&config).unwrap();

    let crypto = market
        .historical_series(
            Domain::Crypto,
            &["Bitcoin".to_string()],
            date(2024, 9, 1),
            date(2024, 9, 15),
            "USD",
            ValueKind::Price,
        )
        .await;
    assert!(matches!(
        crypto,
        Err(MarketError::Network {
            status: Some(500),
            ..
        })
    ));

    let metal = market
        .historical_series(
            Domain::Metal,
            &gold(),
            date(2024, 9, 1),
            date(2024, 9, 15),
            "USD",
            ValueKind::Price,
        )
        .await
        .unwrap();
    assert!(metal.series.contains_key("Gold"));
}

#[test_log::test(tokio::test)]
async fn test_missing_rate_loads_table_once_and_signals() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_currencies(&server, r#"{"currencies": {"EUR": 0.91}}"#, 1).await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), cache_dir.path());
    let market = MarketData::from_config(&config).unwrap();

    // CHF is a configured code but absent from the table payload.
    let result = market
        .historical_series(
            Domain::Metal,
            &gold(),
            date(2024, 9, 1),
            date(2024, 9, 15),
            "CHF",
            ValueKind::Price,
        )
        .await;
    assert!(matches!(result, Err(MarketError::MissingRate(code)) if code == "CHF"));

    // Asking again must not refetch the table (the mount expects 1 call).
    let again = market.exchange_rate("CHF").await;
    assert!(matches!(again, Err(MarketError::MissingRate(_))));
    assert_eq!(market.exchange_rate("EUR").await.unwrap(), 0.91);
}
