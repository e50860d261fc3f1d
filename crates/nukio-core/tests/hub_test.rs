#![allow(clippy::unwrap_used)]
// End-to-end: a real webhook listener feeding the hub over loopback.

mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;

use common::{FakeBridge, devices};
use nukio_core::{BridgeConfig, Hub, HubConfig, Origin, WebhookConfig};

fn config(webhook: WebhookConfig) -> HubConfig {
    HubConfig {
        bridge: BridgeConfig::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            SecretString::from("unused".to_owned()),
        ),
        webhook,
        devices: devices(),
    }
}

fn loopback() -> WebhookConfig {
    WebhookConfig {
        bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        advertise_host: Some("127.0.0.1".into()),
        ..WebhookConfig::default()
    }
}

#[tokio::test]
async fn test_webhook_reaches_store_and_accessory() {
    let bridge = FakeBridge::new();
    let hub = Hub::with_bridge(config(loopback()), bridge.clone());
    let accessory = hub.accessory("100").unwrap();
    let mut watch = hub.store().subscribe("100").unwrap();

    let addr = hub.start().await.unwrap().unwrap();
    assert_eq!(bridge.callbacks(), vec![format!("http://127.0.0.1:{}/", addr.port())]);

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/"))
        .json(&json!({ "nukiId": 100, "state": 3, "batteryCritical": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    tokio::time::timeout(Duration::from_secs(2), watch.changed())
        .await
        .unwrap()
        .unwrap();
    let state = hub.store().get("100").unwrap();
    assert!(!state.is_locked);
    assert!(state.battery_critical);
    assert_eq!(state.source, Origin::Webhook);

    let view = accessory.view();
    assert_eq!(view.current_locked, Some(false));
    assert!(view.low_battery);
    assert_eq!(bridge.command_count(), 0);

    hub.shutdown().await;
}

#[tokio::test]
async fn test_start_is_idempotent_and_registration_optional() {
    let bridge = FakeBridge::new();
    let hub = Hub::with_bridge(
        config(WebhookConfig {
            register: false,
            ..loopback()
        }),
        bridge.clone(),
    );

    let first = hub.start().await.unwrap();
    let second = hub.start().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(hub.listener_addr().await, first);
    assert!(bridge.callbacks().is_empty());

    hub.shutdown().await;
    assert_eq!(hub.listener_addr().await, None);
}

#[tokio::test]
async fn test_disabled_listener() {
    let hub = Hub::with_bridge(
        config(WebhookConfig {
            enabled: false,
            ..loopback()
        }),
        FakeBridge::new(),
    );
    assert_eq!(hub.start().await.unwrap(), None);
    hub.shutdown().await;
}
