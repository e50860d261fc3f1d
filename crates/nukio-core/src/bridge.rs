// ── Bridge seam ──
//
// `LockBridge` is everything the core needs from the bridge. The HTTP
// client implements it; tests substitute scripted fakes.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nukio_api::{BridgeClient, BridgeLockState, LockAction};

use crate::error::CoreError;

/// A state reading as the bridge reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeReading {
    pub state: BridgeLockState,
    pub battery_critical: bool,
    /// When the bridge produced this reading (earlier than now for cache hits).
    pub fetched_at: DateTime<Utc>,
}

/// Confirmation of a lock action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAck {
    pub battery_critical: bool,
}

/// Operations the core performs against the bridge.
pub trait LockBridge: Send + Sync + 'static {
    fn query(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<BridgeReading, CoreError>> + Send;

    fn send_command(
        &self,
        device_id: &str,
        action: LockAction,
        timeout: Duration,
    ) -> impl Future<Output = Result<CommandAck, CoreError>> + Send;

    /// Forget any cached reading for the device.
    fn invalidate(&self, device_id: &str);

    /// Register a webhook callback URL unless already present.
    fn ensure_callback(&self, url: &str) -> impl Future<Output = Result<bool, CoreError>> + Send;
}

impl LockBridge for BridgeClient {
    async fn query(&self, device_id: &str) -> Result<BridgeReading, CoreError> {
        let reading = self.lock_state(device_id).await?;
        Ok(BridgeReading {
            state: reading.value.state,
            battery_critical: reading.value.battery_critical,
            fetched_at: reading.fetched_at,
        })
    }

    async fn send_command(
        &self,
        device_id: &str,
        action: LockAction,
        timeout: Duration,
    ) -> Result<CommandAck, CoreError> {
        let resp = self.lock_action(device_id, action, timeout).await?;
        Ok(CommandAck {
            battery_critical: resp.battery_critical,
        })
    }

    fn invalidate(&self, device_id: &str) {
        BridgeClient::invalidate(self, device_id);
    }

    async fn ensure_callback(&self, url: &str) -> Result<bool, CoreError> {
        Ok(BridgeClient::ensure_callback(self, url).await?)
    }
}
