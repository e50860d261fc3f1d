// Bridge HTTP client
//
// Wraps `reqwest::Client` with bridge-specific URL construction, token
// injection, per-request timeouts and the lock state cache. Callback
// management lives in `callbacks.rs` as further inherent methods.

use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{Cached, ResponseCache};
use crate::error::Error;
use crate::models::{LockAction, LockActionResponse, LockStateResponse};
use crate::transport::TransportConfig;

/// A lock state reading, possibly served from the cache.
pub type LockStateReading = Cached<LockStateResponse>;

/// Which per-request timeout applies, and how a timeout is reported.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RequestKind {
    Query,
    Command,
}

/// HTTP client for the bridge's token-authenticated REST API.
///
/// Stateless per call apart from the lock state cache. No retries happen
/// here; retry policy belongs to the caller.
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    query_timeout: Duration,
    command_timeout: Duration,
    cache: ResponseCache<LockStateResponse>,
}

impl BridgeClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the bridge root, e.g. `http://192.168.1.50:8080`.
    pub fn new(base_url: Url, token: SecretString, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, token, transport))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        token: SecretString,
        transport: &TransportConfig,
    ) -> Self {
        Self {
            http,
            base_url,
            token,
            query_timeout: transport.query_timeout,
            command_timeout: transport.command_timeout,
            cache: ResponseCache::new(transport.cache_ttl, transport.cache_directory.clone()),
        }
    }

    /// The bridge base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Timeout applied to state queries and callback management.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Timeout applied to lock actions unless overridden per call.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    // ── Lock endpoints ───────────────────────────────────────────────

    /// Current lock state of a device, served from the cache while fresh.
    ///
    /// `GET /lockState?nukiId={id}`
    pub async fn lock_state(&self, device_id: &str) -> Result<LockStateReading, Error> {
        let key = cache_key(device_id);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let url = self.endpoint("lockState", &[("nukiId", device_id)])?;
        // The reading is only as fresh as the moment it was requested.
        let fetched_at = Utc::now();
        let response: LockStateResponse = self
            .send(self.http.get(url), RequestKind::Query, self.query_timeout, Some(device_id))
            .await?;

        if !response.success {
            return Err(Error::BadResponse {
                message: format!("bridge reported failure reading state of {device_id}"),
            });
        }

        self.cache.insert(&key, response.clone(), fetched_at);
        Ok(Cached {
            value: response,
            fetched_at,
        })
    }

    /// Send a lock action and wait up to `timeout` for the bridge to confirm.
    ///
    /// `POST /lockAction?nukiId={id}&action={code}`
    ///
    /// On success the cached lock state of the device is dropped. A timeout
    /// yields [`Error::CommandTimeout`]: the action may still complete.
    pub async fn lock_action(
        &self,
        device_id: &str,
        action: LockAction,
        timeout: Duration,
    ) -> Result<LockActionResponse, Error> {
        let code = action.code().to_string();
        let url = self.endpoint("lockAction", &[("nukiId", device_id), ("action", &code)])?;
        debug!(device = device_id, %action, "sending lock action");

        let result: Result<LockActionResponse, Error> = self
            .send(self.http.post(url), RequestKind::Command, timeout, Some(device_id))
            .await;

        // Whatever happened, the cached state can no longer be trusted.
        self.invalidate(device_id);

        let response = result?;
        if !response.success {
            warn!(device = device_id, %action, "bridge rejected lock action");
            return Err(Error::ActionRejected {
                device_id: device_id.to_owned(),
                action: action.code(),
            });
        }
        Ok(response)
    }

    /// Drop any cached lock state for the device.
    pub fn invalidate(&self, device_id: &str) {
        self.cache.invalidate(&cache_key(device_id));
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}?{params}&token={token}`.
    pub(crate) fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self.base_url.join(path)?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            query.append_pair("token", self.token.expose_secret());
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) fn http_get(&self, url: Url) -> reqwest::RequestBuilder {
        self.http.get(url)
    }

    /// Send a request with the given timeout and decode the JSON body.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        kind: RequestKind,
        timeout: Duration,
        device_id: Option<&str>,
    ) -> Result<T, Error> {
        let resp = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, kind, timeout))?;

        let status = resp.status();
        debug!(status = status.as_u16(), url = %redact(resp.url()), "bridge response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized);
        }
        if let (StatusCode::NOT_FOUND, Some(id)) = (status, device_id) {
            return Err(Error::UnknownDevice {
                device_id: id.to_owned(),
            });
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await.map_err(|e| classify(e, kind, timeout))?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

fn cache_key(device_id: &str) -> String {
    format!("lockState:{device_id}")
}

/// Map a reqwest failure onto the timeout variant matching the request kind.
fn classify(err: reqwest::Error, kind: RequestKind, timeout: Duration) -> Error {
    if !err.is_timeout() {
        return Error::Transport(err);
    }
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    match kind {
        RequestKind::Query => Error::Timeout { timeout_ms },
        RequestKind::Command => Error::CommandTimeout { timeout_ms },
    }
}

/// URL with the token parameter masked, for logging.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".to_owned() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}
