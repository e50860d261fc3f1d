// ── Lock controller ──
//
// Orchestrates commands and queries for every configured device. Each
// device owns a handle with its command gate and re-lock timer slot, built
// once at startup. Commands never queue: a second command for a busy
// device is rejected.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::Utc;
use nukio_api::LockAction;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accessory::HostNotifier;
use crate::bridge::LockBridge;
use crate::error::CoreError;
use crate::model::{Device, DeviceId, LockState, LockStateMode, Origin};
use crate::store::LockStateStore;

// ── Settings ─────────────────────────────────────────────────────────

/// Tuning for command handling.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    /// How long a lock action may take before it is reported unconfirmed.
    pub command_timeout: Duration,
    /// Delay before a door latch is considered locked again.
    pub relock_delay: Duration,
    pub lock_state_mode: LockStateMode,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(45),
            relock_delay: Duration::from_secs(1),
            lock_state_mode: LockStateMode::default(),
        }
    }
}

// ── Per-device handle ────────────────────────────────────────────────

struct DeviceHandle {
    device: Device,
    /// Held for the duration of a command.
    command: Mutex<()>,
    /// Cancels the pending spring-back, if any.
    relock: std::sync::Mutex<Option<CancellationToken>>,
}

impl DeviceHandle {
    fn new(device: Device) -> Self {
        Self {
            device,
            command: Mutex::new(()),
            relock: std::sync::Mutex::new(None),
        }
    }

    fn cancel_relock(&self) {
        let pending = self
            .relock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = pending {
            token.cancel();
            debug!(device = %self.device.id, "pending re-lock cancelled");
        }
    }

    /// Take the command gate, failing fast when it is held.
    fn begin_command(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.command.try_lock().map_err(|_| {
            debug!(device = %self.device.id, "command rejected, another is in flight");
            CoreError::CommandInFlight {
                device_id: self.device.id.to_string(),
            }
        })
    }

    fn arm_relock(&self, token: CancellationToken) {
        let previous = self
            .relock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token);
        if let Some(previous) = previous {
            previous.cancel();
        }
    }
}

// ── LockController ───────────────────────────────────────────────────

/// Issues lock commands and reads state for the configured devices.
pub struct LockController<B> {
    bridge: Arc<B>,
    store: Arc<LockStateStore>,
    notifier: Arc<HostNotifier>,
    devices: HashMap<DeviceId, DeviceHandle>,
    settings: ControllerSettings,
    cancel: CancellationToken,
}

impl<B: LockBridge> LockController<B> {
    /// `cancel` bounds the lifetime of re-lock timers.
    pub fn new(
        bridge: Arc<B>,
        store: Arc<LockStateStore>,
        notifier: Arc<HostNotifier>,
        devices: impl IntoIterator<Item = Device>,
        settings: ControllerSettings,
        cancel: CancellationToken,
    ) -> Self {
        let devices = devices
            .into_iter()
            .map(|d| (d.id.clone(), DeviceHandle::new(d)))
            .collect();
        Self {
            bridge,
            store,
            notifier,
            devices,
            settings,
            cancel,
        }
    }

    pub fn store(&self) -> &Arc<LockStateStore> {
        &self.store
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn device(&self, id: &str) -> Result<&Device, CoreError> {
        self.handle(id).map(|h| &h.device)
    }

    /// Configured devices, ordered by id.
    pub fn devices(&self) -> Vec<&Device> {
        let mut devices: Vec<&Device> = self.devices.values().map(|h| &h.device).collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Lock a device.
    ///
    /// Door latches lock optimistically without contacting the bridge.
    pub async fn lock(&self, id: &str) -> Result<LockState, CoreError> {
        let handle = self.handle(id)?;
        let _gate = handle.begin_command()?;
        handle.cancel_relock();

        if handle.device.is_door_latch() {
            let battery = self.store.peek(id)?.is_some_and(|s| s.battery_critical);
            self.store
                .apply_command_result(id, LockState::new(true, battery, Utc::now(), Origin::Command))?;
            info!(device = %handle.device.id, "door latch locked (optimistic)");
            return self.store.get(id);
        }

        self.send(handle, handle.device.resolve_lock_action(), true).await
    }

    /// Unlock a device.
    ///
    /// A confirmed door-latch unlock arms a timer that re-locks it after
    /// the configured delay unless another command arrives first.
    pub async fn unlock(&self, id: &str) -> Result<LockState, CoreError> {
        let handle = self.handle(id)?;
        let _gate = handle.begin_command()?;
        handle.cancel_relock();

        let state = self
            .send(handle, handle.device.resolve_unlock_action(), false)
            .await?;
        if handle.device.is_door_latch() {
            self.schedule_relock(handle);
        }
        Ok(state)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Ask the bridge (or its cache) for the device state, fold the reading
    /// into the store and return the store's view.
    pub async fn current_state(&self, id: &str) -> Result<LockState, CoreError> {
        self.handle(id)?;
        let reading = self.bridge.query(id).await?;
        let polled = LockState::new(
            self.settings.lock_state_mode.is_locked(reading.state),
            reading.battery_critical,
            reading.fetched_at,
            Origin::Poll,
        );
        self.store.apply_poll(id, polled)?;
        self.store.get(id)
    }

    pub async fn low_battery(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.current_state(id).await?.battery_critical)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn handle(&self, id: &str) -> Result<&DeviceHandle, CoreError> {
        self.devices.get(id).ok_or_else(|| CoreError::DeviceNotFound {
            identifier: id.to_owned(),
        })
    }

    /// Send `action` and, once confirmed, record the requested direction.
    async fn send(
        &self,
        handle: &DeviceHandle,
        action: LockAction,
        locked: bool,
    ) -> Result<LockState, CoreError> {
        let id = handle.device.id.as_str();
        debug!(device = id, %action, "sending command");

        let ack = match self
            .bridge
            .send_command(id, action, self.settings.command_timeout)
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                warn!(device = id, %action, error = %e, "command failed, state left unchanged");
                return Err(e);
            }
        };

        let state = LockState::new(
            locked,
            ack.battery_critical,
            Utc::now(),
            Origin::Command,
        );
        self.store.apply_command_result(id, state)?;
        info!(device = id, %action, locked = state.is_locked, "command confirmed");
        self.store.get(id)
    }

    fn schedule_relock(&self, handle: &DeviceHandle) {
        let token = self.cancel.child_token();
        handle.arm_relock(token.clone());

        let id = handle.device.id.clone();
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let delay = self.settings.relock_delay;
        debug!(device = %id, ?delay, "re-lock armed");

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    match store.apply_relock(id.as_str(), Utc::now(), &token) {
                        Ok(Some(notification)) => {
                            info!(device = %id, "door latch re-locked");
                            notifier.notify(&notification);
                        }
                        Ok(None) => debug!(device = %id, "re-lock superseded"),
                        Err(e) => warn!(device = %id, error = %e, "re-lock failed"),
                    }
                }
            }
        });
    }
}
