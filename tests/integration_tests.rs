//! Integration tests for the chart-screener pipeline
//!
//! Twelve Data and Telegram are replaced by wiremock servers.

use approx::assert_relative_eq;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chart_screener::config::{DataProviderConfig, IndicatorConfig, ScreenerConfig, TelegramConfig};
use chart_screener::data::{DataError, TwelveDataClient};
use chart_screener::indicators::{annotate, WarmUp};
use chart_screener::notifier::{NotifyError, TelegramNotifier};
use chart_screener::pipeline::{screener_message, PipelineError, Session};
use chart_screener::screener::ScreenerRule;
use chart_screener::{alerts, Candle, Config, Instrument, PriceSeries, Timeframe};

// =============================================================================
// Test Utilities
// =============================================================================

const API_KEY: &str = "test-key";
const BOT_TOKEN: &str = "123:abc";
const CHAT_ID: &str = "-1001";

// Falls, rallies, falls again: a golden cross then a death cross with EMA 2/4
const ROUND_TRIP: [f64; 14] = [
    20.0, 19.0, 18.0, 17.0, 16.0, 15.0, 18.0, 21.0, 24.0, 27.0, 22.0, 17.0, 12.0, 9.0,
];

/// Build a Twelve Data `time_series` body, newest bar first like the real API
fn time_series_body(symbol: &str, interval: &str, closes: &[f64]) -> Value {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
    let values: Vec<Value> = closes
        .iter()
        .enumerate()
        .rev()
        .map(|(i, c)| {
            json!({
                "datetime": (start + Duration::minutes(i as i64))
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                "open": format!("{:.5}", c),
                "high": format!("{:.5}", c + 0.5),
                "low": format!("{:.5}", c - 0.5),
                "close": format!("{:.5}", c),
            })
        })
        .collect();

    json!({
        "meta": { "symbol": symbol, "interval": interval, "type": "Digital Currency" },
        "values": values,
        "status": "ok"
    })
}

async fn mount_time_series(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/time_series"))
        .and(query_param("symbol", "BTC/USD"))
        .and(query_param("interval", "1min"))
        .and(query_param("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn data_client(server: &MockServer) -> TwelveDataClient {
    TwelveDataClient::with_client(server.uri(), 50, reqwest::Client::new())
}

fn telegram_config(server: &MockServer) -> TelegramConfig {
    TelegramConfig {
        bot_token: BOT_TOKEN.to_string(),
        chat_id: CHAT_ID.to_string(),
        base_url: server.uri(),
    }
}

fn small_windows() -> IndicatorConfig {
    IndicatorConfig {
        fast_period: 2,
        slow_period: 4,
        warm_up: WarmUp::Undefined,
    }
}

fn session_config(data: &MockServer, telegram: &MockServer) -> Config {
    Config {
        data_provider: Some(DataProviderConfig {
            api_key: API_KEY.to_string(),
            base_url: data.uri(),
            output_size: 50,
        }),
        telegram: Some(telegram_config(telegram)),
        indicators: small_windows(),
        screener: ScreenerConfig::default(),
    }
}

// =============================================================================
// Data Loader Tests
// =============================================================================

#[tokio::test]
async fn test_load_normalizes_to_oldest_first() {
    let server = MockServer::start().await;
    let body = time_series_body("BTC/USD", "1min", &[10.0, 11.0, 12.0, 11.0, 13.0]);
    mount_time_series(&server, body).await;

    let series = data_client(&server)
        .load(Instrument::BtcUsd, Timeframe::OneMinute, API_KEY)
        .await
        .expect("series");

    assert_eq!(series.len(), 5);
    assert_eq!(series.instrument(), Instrument::BtcUsd);
    assert_eq!(series.closes(), vec![10.0, 11.0, 12.0, 11.0, 13.0]);
    assert!(series.candles().windows(2).all(|w| w[0].datetime < w[1].datetime));
    assert_eq!(series.candles()[0].volume, 0.0);
}

#[tokio::test]
async fn test_load_sends_output_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/time_series"))
        .and(query_param("outputsize", "50"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(time_series_body("AAPL", "5min", &[1.0, 2.0])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let series = data_client(&server)
        .load(Instrument::Aapl, Timeframe::FiveMinutes, API_KEY)
        .await;
    assert!(series.is_some());
}

#[tokio::test]
async fn test_provider_error_payload_is_no_data() {
    let server = MockServer::start().await;
    let body = json!({
        "code": 400,
        "message": "**symbol** not found: BTC/USD. Please specify it correctly",
        "status": "error"
    });
    Mock::given(method("GET"))
        .and(path("/time_series"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = data_client(&server);
    let err = client
        .fetch(Instrument::BtcUsd, Timeframe::OneMinute, API_KEY)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Upstream { code: 400, .. }));

    assert!(client.load(Instrument::BtcUsd, Timeframe::OneMinute, API_KEY).await.is_none());
}

#[tokio::test]
async fn test_invalid_credential_is_no_data() {
    let server = MockServer::start().await;
    let body = json!({
        "code": 401,
        "message": "**apikey** parameter is incorrect or not specified.",
        "status": "error"
    });
    Mock::given(method("GET"))
        .and(path("/time_series"))
        .respond_with(ResponseTemplate::new(401).set_body_json(body))
        .mount(&server)
        .await;

    let err = data_client(&server)
        .fetch(Instrument::EurUsd, Timeframe::OneMinute, "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Upstream { code: 401, .. }));
}

#[tokio::test]
async fn test_server_error_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/time_series"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = data_client(&server)
        .fetch(Instrument::BtcUsd, Timeframe::OneMinute, API_KEY)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Http { status: 503 }));
}

#[tokio::test]
async fn test_empty_values_is_no_data() {
    let server = MockServer::start().await;
    mount_time_series(&server, time_series_body("BTC/USD", "1min", &[])).await;

    let err = data_client(&server)
        .fetch(Instrument::BtcUsd, Timeframe::OneMinute, API_KEY)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Empty { .. }));
}

#[tokio::test]
async fn test_garbled_bar_yields_no_partial_series() {
    let server = MockServer::start().await;
    let mut body = time_series_body("BTC/USD", "1min", &[10.0, 11.0, 12.0]);
    body["values"][1]["close"] = json!("not-a-number");
    mount_time_series(&server, body).await;

    let client = data_client(&server);
    let err = client
        .fetch(Instrument::BtcUsd, Timeframe::OneMinute, API_KEY)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidField { field: "close", .. }));
    assert!(client.load(Instrument::BtcUsd, Timeframe::OneMinute, API_KEY).await.is_none());
}

#[tokio::test]
async fn test_empty_credential_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = data_client(&server);
    assert!(client.load(Instrument::BtcUsd, Timeframe::OneMinute, "").await.is_none());
    assert!(matches!(
        client.fetch(Instrument::BtcUsd, Timeframe::OneMinute, "  ").await,
        Err(DataError::MissingCredential)
    ));
}

// =============================================================================
// Indicator Tests
// =============================================================================

fn series_from_closes(closes: &[f64]) -> PriceSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle::new_unchecked(start + Duration::minutes(i as i64), c, c, c, c, 0.0))
        .collect();
    PriceSeries::new(Instrument::BtcUsd, Timeframe::OneMinute, candles)
}

#[test]
fn test_annotate_preserves_rows_and_order() {
    let series = series_from_closes(&ROUND_TRIP);
    let before = series.clone();

    let annotated = annotate(series, &IndicatorConfig::default());

    assert_eq!(annotated.series(), &before);
    assert_eq!(annotated.fast().values.len(), before.len());
    assert_eq!(annotated.slow().values.len(), before.len());
    assert_eq!(annotated.fast().period, 20);
    assert_eq!(annotated.slow().period, 50);
}

#[test]
fn test_annotate_golden_value_with_default_windows() {
    let series = series_from_closes(&[10.0, 11.0, 12.0, 11.0, 13.0]);
    let annotated = annotate(series, &IndicatorConfig::default());
    assert_relative_eq!(annotated.fast().last().unwrap(), 11.4, epsilon = 1e-12);
}

#[test]
fn test_annotate_single_bar_is_undefined() {
    let annotated = annotate(series_from_closes(&[42.0]), &IndicatorConfig::default());

    assert_eq!(annotated.len(), 1);
    assert!(annotated.fast().is_undefined());
    assert!(annotated.slow().is_undefined());
    assert_eq!(alerts::check(&annotated), None);
}

// =============================================================================
// Notifier Tests
// =============================================================================

#[tokio::test]
async fn test_telegram_send_delivers_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", BOT_TOKEN)))
        .and(body_json(json!({ "chat_id": CHAT_ID, "text": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_client(&telegram_config(&server), reqwest::Client::new());
    notifier.send("hello").await.expect("delivered");
}

#[tokio::test]
async fn test_telegram_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_client(&telegram_config(&server), reqwest::Client::new());
    match notifier.send("hello").await {
        Err(NotifyError::Rejected { status, description }) => {
            assert_eq!(status, 400);
            assert_eq!(description, "Bad Request: chat not found");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_telegram_empty_message_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_client(&telegram_config(&server), reqwest::Client::new());
    assert!(matches!(notifier.send("").await, Err(NotifyError::EmptyMessage)));
}

// =============================================================================
// Session Tests
// =============================================================================

#[tokio::test]
async fn test_session_screen_and_forward() {
    let data = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_time_series(&data, time_series_body("BTC/USD", "1min", &ROUND_TRIP)).await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", BOT_TOKEN)))
        .and(body_string_contains("Screener Signal for BTC/USD - 1min"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&telegram)
        .await;

    let mut session = Session::new(&session_config(&data, &telegram)).unwrap();
    assert!(session.is_data_configured());
    assert!(session.is_notifier_configured());

    let result = session.screen(Instrument::BtcUsd, Timeframe::OneMinute).await.unwrap();
    let rules: Vec<ScreenerRule> = result.hits.iter().map(|h| h.rule).collect();
    assert_eq!(rules, vec![ScreenerRule::GoldenCross, ScreenerRule::DeathCross]);

    session.notify(&screener_message(&result)).await.unwrap();
}

#[tokio::test]
async fn test_session_alerts_are_repeatable() {
    let data = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_time_series(&data, time_series_body("BTC/USD", "1min", &ROUND_TRIP[..7])).await;

    let mut session = Session::new(&session_config(&data, &telegram)).unwrap();
    let first = session.alerts(Instrument::BtcUsd, Timeframe::OneMinute).await.unwrap();
    let second = session.alerts(Instrument::BtcUsd, Timeframe::OneMinute).await.unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_session_reports_no_data() {
    let data = MockServer::start().await;
    let telegram = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 401,
            "message": "**apikey** parameter is incorrect",
            "status": "error"
        })))
        .mount(&data)
        .await;

    let mut session = Session::new(&session_config(&data, &telegram)).unwrap();
    let err = session.screen(Instrument::BtcUsd, Timeframe::OneMinute).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::NoData {
            instrument: Instrument::BtcUsd,
            timeframe: Timeframe::OneMinute
        }
    ));
}

#[tokio::test]
async fn test_session_surfaces_delivery_failure() {
    let data = MockServer::start().await;
    let telegram = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "description": "Unauthorized"
        })))
        .mount(&telegram)
        .await;

    let mut session = Session::new(&session_config(&data, &telegram)).unwrap();
    let err = session.notify("alert").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Notify(NotifyError::Rejected { status: 401, .. })
    ));
}
