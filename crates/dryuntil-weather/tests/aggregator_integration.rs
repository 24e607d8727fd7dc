//! Integration tests for WeatherAggregator using wiremock.
//!
//! Both upstream APIs are mocked; response delays control which lookup
//! completes first.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use dryuntil_core::{Config, GeocodeProvider};
use dryuntil_weather::{ChannelSink, Notification, Position, WeatherAggregator};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RAIN_AT_1420: &str = "0|14:00\n0|14:10\n3|14:20\n5|14:30\n";

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.services.geocode_url = format!("{}/reverse", server.uri());
    config.services.precipitation_url = format!("{}/raintext", server.uri());
    config
}

fn aggregator(config: &Config) -> (WeatherAggregator, UnboundedReceiver<Notification>) {
    let (sink, rx) = ChannelSink::new();
    let aggregator = WeatherAggregator::from_config(config, Arc::new(sink)).unwrap();
    (aggregator, rx)
}

fn springfield() -> serde_json::Value {
    serde_json::json!({
        "display_name": "Springfield, Illinois, United States",
        "address": { "city": "Springfield", "state": "Illinois", "country": "United States" }
    })
}

async fn mount_place(server: &MockServer, body: serde_json::Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_rain(server: &MockServer, body: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/raintext"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(delay),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn next(rx: &mut UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("notification within 5s")
        .expect("sink still open")
}

async fn assert_quiet(rx: &mut UnboundedReceiver<Notification>, wait: Duration) {
    let got = tokio::time::timeout(wait, rx.recv()).await;
    assert!(got.is_err(), "unexpected notification: {:?}", got);
}

fn amsterdam() -> Position {
    Position::new(52.37, 4.89)
}

#[tokio::test]
async fn test_place_first_waits_for_rain() {
    let server = MockServer::start().await;
    mount_place(&server, springfield(), Duration::ZERO).await;
    mount_rain(&server, RAIN_AT_1420, Duration::from_millis(400)).await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());

    // Place is back by now; rain is still pending
    assert_quiet(&mut rx, Duration::from_millis(150)).await;

    let n = next(&mut rx).await;
    assert_eq!(
        n,
        Notification {
            city: "Springfield".into(),
            rain: 1,
            start: Some("14:20".into()),
        }
    );
    assert_quiet(&mut rx, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_rain_first_waits_for_place() {
    let server = MockServer::start().await;
    mount_place(&server, springfield(), Duration::from_millis(400)).await;
    mount_rain(&server, "0|14:00\n0|14:10\n", Duration::ZERO).await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());

    assert_quiet(&mut rx, Duration::from_millis(150)).await;

    let n = next(&mut rx).await;
    assert_eq!(n.city, "Springfield");
    assert_eq!(n.rain, 0);
    assert_eq!(n.start.as_deref(), Some(""));
    assert_quiet(&mut rx, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_simultaneous_resolution_emits_once() {
    let server = MockServer::start().await;
    mount_place(&server, springfield(), Duration::ZERO).await;
    mount_rain(&server, RAIN_AT_1420, Duration::ZERO).await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());

    let n = next(&mut rx).await;
    assert_eq!(n.start.as_deref(), Some("14:20"));
    assert_quiet(&mut rx, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_tolerates_malformed_rows() {
    let server = MockServer::start().await;
    mount_place(&server, springfield(), Duration::ZERO).await;
    mount_rain(&server, "0|14:00\n\ngarbage\n2|14:20\n", Duration::ZERO).await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());

    let n = next(&mut rx).await;
    assert_eq!(n.rain, 1);
    assert_eq!(n.start.as_deref(), Some("14:20"));
}

#[tokio::test]
async fn test_place_failure_suppresses_notification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_rain(&server, RAIN_AT_1420, Duration::ZERO).await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());

    assert_quiet(&mut rx, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_malformed_place_json_suppresses_notification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;
    mount_rain(&server, RAIN_AT_1420, Duration::ZERO).await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());

    assert_quiet(&mut rx, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_rain_failure_suppresses_notification() {
    let server = MockServer::start().await;
    mount_place(&server, springfield(), Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/raintext"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());

    assert_quiet(&mut rx, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_position_failure_sends_unavailable() {
    let server = MockServer::start().await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_failed(1);

    let n = next(&mut rx).await;
    assert_eq!(n, Notification::unavailable(2));
    assert!(n.start.is_none());
    assert_quiet(&mut rx, Duration::from_millis(100)).await;

    // No lookups are made on the failure path
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_position_failure_uses_configured_sentinel() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.notifier.unavailable_rain = 0;

    let (aggregator, mut rx) = aggregator(&config);
    aggregator.on_position_failed(3);

    let n = next(&mut rx).await;
    assert_eq!(n.city, "Unavailable");
    assert_eq!(n.rain, 0);
}

#[tokio::test]
async fn test_position_failure_independent_of_pending_cycle() {
    let server = MockServer::start().await;
    mount_place(&server, springfield(), Duration::from_millis(300)).await;
    mount_rain(&server, RAIN_AT_1420, Duration::from_millis(300)).await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    aggregator.on_position_resolved(amsterdam());
    aggregator.on_position_failed(2);

    let first = next(&mut rx).await;
    assert_eq!(first.city, "Unavailable");

    // The in-flight cycle still completes on its own
    let second = next(&mut rx).await;
    assert_eq!(second.city, "Springfield");
}

#[tokio::test]
async fn test_out_of_range_position_is_unavailable() {
    let server = MockServer::start().await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    assert_eq!(aggregator.on_position_resolved(Position::new(123.0, 4.0)), None);

    let n = next(&mut rx).await;
    assert_eq!(n.city, "Unavailable");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_superseded_cycle_never_delivers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "52.1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "address": { "city": "Haarlem" } }))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "51.9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "address": { "city": "Rotterdam" } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raintext"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0|14:00\n"))
        .mount(&server)
        .await;

    let (aggregator, mut rx) = aggregator(&config_for(&server));
    let first = aggregator.on_position_resolved(Position::new(52.1, 4.6));
    let second = aggregator.on_position_resolved(Position::new(51.9, 4.5));
    assert_eq!(second, first.map(|cycle| cycle + 1));
    assert!(second.is_some());

    let n = next(&mut rx).await;
    assert_eq!(n.city, "Rotterdam");
    assert_quiet(&mut rx, Duration::from_millis(700)).await;
}

#[tokio::test]
async fn test_openweathermap_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/find"))
        .and(query_param("cnt", "1"))
        .and(query_param("appid", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "accurate",
            "cod": "200",
            "count": 1,
            "list": [{ "id": 2759794, "name": "Amsterdam" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_rain(&server, "000|09:05\r\n000|09:10\r\n", Duration::ZERO).await;

    let mut config = config_for(&server);
    config.services.geocode_provider = GeocodeProvider::OpenWeatherMap;
    config.services.geocode_url = format!("{}/find", server.uri());
    config.services.openweathermap_api_key = Some("test-key".into());

    let (aggregator, mut rx) = aggregator(&config);
    aggregator.on_position_resolved(amsterdam());

    let n = next(&mut rx).await;
    assert_eq!(n.city, "Amsterdam");
    assert_eq!(n.rain, 0);
}

#[tokio::test]
async fn test_rain_threshold_from_config() {
    let server = MockServer::start().await;
    mount_place(&server, springfield(), Duration::ZERO).await;
    mount_rain(&server, "010|14:00\n030|14:05\n060|14:10\n", Duration::ZERO).await;

    let mut config = config_for(&server);
    config.notifier.rain_threshold = 30;

    let (aggregator, mut rx) = aggregator(&config);
    aggregator.on_position_resolved(amsterdam());

    let n = next(&mut rx).await;
    assert_eq!(n.start.as_deref(), Some("14:10"));
}
