//! Webhook listener for bridge push notifications.
//!
//! The bridge POSTs a JSON notification to every registered callback URL
//! whenever a lock's state or battery status changes. This module runs a
//! small `axum` server that parses those notifications and publishes them
//! as [`WebhookEvent`]s through a [`tokio::sync::broadcast`] channel.
//!
//! Publishing never waits on subscribers, so the bridge always gets its
//! acknowledgment immediately.
//!
//! # Example
//!
//! ```rust,ignore
//! use nukio_api::webhook::WebhookListener;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let handle = WebhookListener::bind("0.0.0.0:8882".parse()?, cancel.clone()).await?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{} -> {:?}", event.device_id, event.state);
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::models::{BridgeLockState, WebhookPayload};

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── WebhookEvent ─────────────────────────────────────────────────────

/// A parsed bridge notification, stamped with its receipt time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookEvent {
    pub device_id: String,
    pub state: BridgeLockState,
    pub state_name: Option<String>,
    pub battery_critical: bool,
    pub received_at: DateTime<Utc>,
}

impl WebhookEvent {
    fn from_payload(payload: WebhookPayload, received_at: DateTime<Utc>) -> Self {
        Self {
            device_id: payload.nuki_id,
            state: payload.state,
            state_name: payload.state_name,
            battery_critical: payload.battery_critical,
            received_at,
        }
    }
}

/// Parse a raw notification body.
pub fn parse_notification(body: &[u8], received_at: DateTime<Utc>) -> Result<WebhookEvent, Error> {
    let payload: WebhookPayload =
        serde_json::from_slice(body).map_err(|e| Error::MalformedNotification {
            message: e.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
        })?;
    Ok(WebhookEvent::from_payload(payload, received_at))
}

// ── WebhookListener ──────────────────────────────────────────────────

/// Entry point for starting the webhook HTTP server.
pub struct WebhookListener;

impl WebhookListener {
    /// Bind the listener and spawn the server task.
    ///
    /// Port `0` binds an ephemeral port; read it back via
    /// [`WebhookHandle::local_addr`].
    pub async fn bind(addr: SocketAddr, cancel: CancellationToken) -> Result<WebhookHandle, Error> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let app = router(event_tx.clone());

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let shutdown = async move { task_cancel.cancelled().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "webhook listener stopped unexpectedly");
            }
            debug!("webhook listener task finished");
        });

        info!(%local_addr, "webhook listener bound");
        Ok(WebhookHandle {
            local_addr,
            event_tx,
            cancel,
            task,
        })
    }
}

/// Build the listener's router around a broadcast sender.
pub fn router(event_tx: broadcast::Sender<Arc<WebhookEvent>>) -> Router {
    Router::new()
        .route("/", post(receive))
        .route("/webhook", post(receive))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(event_tx)
}

// ── WebhookHandle ────────────────────────────────────────────────────

/// Handle to a running webhook listener.
pub struct WebhookHandle {
    local_addr: SocketAddr,
    event_tx: broadcast::Sender<Arc<WebhookEvent>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WebhookHandle {
    /// The address the listener actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a new receiver for parsed notifications.
    ///
    /// A receiver that falls behind gets
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<WebhookEvent>> {
        self.event_tx.subscribe()
    }

    /// Stop accepting requests and wait for the server task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "webhook listener task panicked");
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn receive(
    State(event_tx): State<broadcast::Sender<Arc<WebhookEvent>>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let event = match parse_notification(&body, Utc::now()) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload dropped");
            return (StatusCode::BAD_REQUEST, Json(json!({ "success": false })));
        }
    };

    debug!(
        device = %event.device_id,
        state = event.state.code(),
        battery_critical = event.battery_critical,
        "webhook received"
    );

    if event_tx.send(Arc::new(event)).is_err() {
        debug!("no webhook subscribers, notification discarded");
    }

    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_stamps_receipt_time() {
        let at = Utc::now();
        let event = parse_notification(
            br#"{"nukiId": 5, "state": 3, "stateName": "unlocked", "batteryCritical": true}"#,
            at,
        )
        .unwrap();
        assert_eq!(event.device_id, "5");
        assert_eq!(event.state, BridgeLockState::Unlocked);
        assert_eq!(event.state_name.as_deref(), Some("unlocked"));
        assert!(event.battery_critical);
        assert_eq!(event.received_at, at);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_notification(b"not json", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::MalformedNotification { .. }));
    }
}
