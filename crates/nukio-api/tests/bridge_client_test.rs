#![allow(clippy::unwrap_used)]
// Integration tests for `BridgeClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nukio_api::{BridgeClient, BridgeLockState, Error, LockAction, TransportConfig};

const TOKEN: &str = "t0ken";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup_with(transport: TransportConfig) -> (MockServer, BridgeClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = BridgeClient::with_client(
        reqwest::Client::new(),
        base_url,
        SecretString::from(TOKEN.to_owned()),
        &transport,
    );
    (server, client)
}

async fn setup() -> (MockServer, BridgeClient) {
    setup_with(TransportConfig::default()).await
}

fn no_cache() -> TransportConfig {
    TransportConfig {
        cache_ttl: Duration::ZERO,
        ..TransportConfig::default()
    }
}

// ── Lock state ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_lock_state_sends_token_and_parses_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .and(query_param("nukiId", "17"))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": 1,
            "stateName": "locked",
            "batteryCritical": true,
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reading = client.lock_state("17").await.unwrap();
    assert_eq!(reading.value.state, BridgeLockState::Locked);
    assert_eq!(reading.value.state_name.as_deref(), Some("locked"));
    assert!(reading.value.battery_critical);
}

#[tokio::test]
async fn test_lock_state_served_from_cache_while_fresh() {
    let (server, client) = setup_with(TransportConfig {
        cache_ttl: Duration::from_secs(30),
        ..TransportConfig::default()
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": 3, "success": true })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let first = client.lock_state("17").await.unwrap();
    let second = client.lock_state("17").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.value.state, BridgeLockState::Unlocked);
}

#[tokio::test]
async fn test_zero_ttl_always_hits_bridge() {
    let (server, client) = setup_with(no_cache()).await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": 1, "success": true })),
        )
        .expect(2)
        .mount(&server)
        .await;

    client.lock_state("17").await.unwrap();
    client.lock_state("17").await.unwrap();
}

#[tokio::test]
async fn test_slow_reading_is_stamped_with_request_time() {
    let (server, client) = setup_with(TransportConfig {
        cache_ttl: Duration::from_secs(30),
        ..TransportConfig::default()
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "state": 3, "success": true }))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let requested = chrono::Utc::now();
    let reading = client.lock_state("17").await.unwrap();
    let answered = chrono::Utc::now();

    assert!(reading.fetched_at >= requested);
    assert!(answered - reading.fetched_at >= chrono::Duration::milliseconds(400));

    let cached = client.lock_state("17").await.unwrap();
    assert_eq!(cached.fetched_at, reading.fetched_at);
}

#[tokio::test]
async fn test_lock_state_reported_failure_is_bad_response() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": 255, "success": false })),
        )
        .mount(&server)
        .await;

    let result = client.lock_state("17").await;
    assert!(
        matches!(result, Err(Error::BadResponse { .. })),
        "expected BadResponse, got: {result:?}"
    );
}

#[tokio::test]
async fn test_lock_state_timeout() {
    let (server, client) = setup_with(TransportConfig {
        query_timeout: Duration::from_millis(100),
        ..no_cache()
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "state": 1, "success": true }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let result = client.lock_state("17").await;
    assert!(
        matches!(result, Err(Error::Timeout { timeout_ms: 100 })),
        "expected Timeout, got: {result:?}"
    );
    assert!(result.unwrap_err().is_transient());
}

// ── Status mapping ──────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.lock_state("17").await;
    assert!(
        matches!(result, Err(Error::Unauthorized)),
        "expected Unauthorized, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unknown_device() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client.lock_state("99").await;
    match result {
        Err(Error::UnknownDevice { device_id }) => assert_eq!(device_id, "99"),
        other => panic!("expected UnknownDevice, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client.lock_state("17").await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(matches!(err, Error::Api { ref message, .. } if message == "busy"));
}

#[tokio::test]
async fn test_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.lock_state("17").await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("oops")),
        other => panic!("expected Deserialization, got: {other:?}"),
    }
}

// ── Lock actions ────────────────────────────────────────────────────

#[tokio::test]
async fn test_lock_action_posts_code() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/lockAction"))
        .and(query_param("nukiId", "17"))
        .and(query_param("action", "2"))
        .and(query_param("token", TOKEN))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "batteryCritical": true })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .lock_action("17", LockAction::Lock, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(resp.success);
    assert!(resp.battery_critical);
}

#[tokio::test]
async fn test_lock_action_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/lockAction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let result = client
        .lock_action("17", LockAction::Unlatch, Duration::from_secs(5))
        .await;
    assert!(
        matches!(result, Err(Error::ActionRejected { action: 3, .. })),
        "expected ActionRejected, got: {result:?}"
    );
}

#[tokio::test]
async fn test_lock_action_timeout_is_unconfirmed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/lockAction"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let err = client
        .lock_action("17", LockAction::Unlock, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandTimeout { timeout_ms: 100 }));
    assert!(err.is_unconfirmed());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_lock_action_invalidates_cached_state() {
    let (server, client) = setup_with(TransportConfig {
        cache_ttl: Duration::from_secs(30),
        ..TransportConfig::default()
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/lockState"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": 1, "success": true })),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lockAction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    client.lock_state("17").await.unwrap();
    client
        .lock_action("17", LockAction::Unlock, Duration::from_secs(5))
        .await
        .unwrap();
    client.lock_state("17").await.unwrap();
}

// ── Callbacks ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_callbacks() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/callback/list"))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "callbacks": [
                { "id": 0, "url": "http://10.0.0.5:8882/" },
                { "id": 1, "url": "http://10.0.0.6:9000/" }
            ]
        })))
        .mount(&server)
        .await;

    let callbacks = client.list_callbacks().await.unwrap();
    assert_eq!(callbacks.len(), 2);
    assert_eq!(callbacks[1].id, 1);
    assert_eq!(callbacks[1].url, "http://10.0.0.6:9000/");
}

#[tokio::test]
async fn test_ensure_callback_skips_known_url() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/callback/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "callbacks": [{ "id": 0, "url": "http://10.0.0.5:8882/" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/callback/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;

    let added = client.ensure_callback("http://10.0.0.5:8882").await.unwrap();
    assert!(!added);
}

#[tokio::test]
async fn test_ensure_callback_registers_new_url() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/callback/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "callbacks": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/callback/add"))
        .and(query_param("url", "http://10.0.0.5:8882/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let added = client.ensure_callback("http://10.0.0.5:8882/").await.unwrap();
    assert!(added);
}

#[tokio::test]
async fn test_remove_callback_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/callback/remove"))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "id not found"
        })))
        .mount(&server)
        .await;

    let result = client.remove_callback(2).await;
    match result {
        Err(Error::BadResponse { message }) => assert_eq!(message, "id not found"),
        other => panic!("expected BadResponse, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_callback_404_is_not_an_unknown_device() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/callback/list"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client.list_callbacks().await;
    assert!(
        matches!(result, Err(Error::Api { status: 404, .. })),
        "expected Api 404, got: {result:?}"
    );
}
