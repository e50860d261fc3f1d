// ── Host-facing accessory layer ──
//
// `HostNotifier` fans background state changes out to per-device host
// callbacks. `LockAccessory` is the characteristic view the host binds to;
// its `set_target_state` is where echoes of background changes are told
// apart from real requests.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::bridge::LockBridge;
use crate::controller::LockController;
use crate::error::CoreError;
use crate::model::{ChangeNotification, DeviceId, LockState, Origin};

// ── HostNotifier ─────────────────────────────────────────────────────

/// Callback invoked for every background change of one device.
pub type HostCallback = Arc<dyn Fn(&ChangeNotification) + Send + Sync>;

/// Per-device table of host callbacks.
#[derive(Default)]
pub struct HostNotifier {
    callbacks: DashMap<DeviceId, Vec<HostCallback>>,
}

impl HostNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, device_id: impl Into<DeviceId>, callback: F)
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        self.callbacks
            .entry(device_id.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Invoke every callback registered for the notification's device,
    /// each exactly once. Returns how many ran.
    pub fn notify(&self, notification: &ChangeNotification) -> usize {
        // Clone out of the map so callbacks may register further callbacks.
        let callbacks: Vec<HostCallback> = self
            .callbacks
            .get(&notification.device_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        if callbacks.is_empty() {
            trace!(device = %notification.device_id, "no host callback registered");
        }
        for callback in &callbacks {
            callback(notification);
        }
        callbacks.len()
    }
}

// ── AccessoryView ────────────────────────────────────────────────────

/// Host characteristics for one lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessoryView {
    /// `None` until the first reading.
    pub current_locked: Option<bool>,
    pub target_locked: Option<bool>,
    pub low_battery: bool,
}

// ── LockAccessory ────────────────────────────────────────────────────

/// The host-side face of one device.
pub struct LockAccessory<B> {
    device_id: DeviceId,
    controller: Arc<LockController<B>>,
    view: Mutex<AccessoryView>,
}

impl<B: LockBridge> LockAccessory<B> {
    pub fn new(device_id: &str, controller: Arc<LockController<B>>) -> Result<Arc<Self>, CoreError> {
        let device_id = controller.device(device_id)?.id.clone();
        Ok(Arc::new(Self {
            device_id,
            controller,
            view: Mutex::new(AccessoryView::default()),
        }))
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn view(&self) -> AccessoryView {
        *self.lock_view()
    }

    /// Mirror background changes into the view via `notifier`.
    pub fn attach(self: &Arc<Self>, notifier: &HostNotifier) {
        let accessory = Arc::clone(self);
        notifier.register(self.device_id.clone(), move |n| accessory.reflect(n));
    }

    /// Apply a background change to the characteristics.
    pub fn reflect(&self, notification: &ChangeNotification) {
        let mut view = self.lock_view();
        view.current_locked = Some(notification.is_locked);
        view.target_locked = Some(notification.is_locked);
        view.low_battery = notification.battery_critical;
    }

    /// The host set the target state.
    ///
    /// Only a `Command` origin is user intent and drives the controller.
    /// Every other origin echoes a state the bridge already reported and
    /// only updates the view.
    pub async fn set_target_state(
        &self,
        locked: bool,
        origin: Origin,
    ) -> Result<AccessoryView, CoreError> {
        if origin != Origin::Command {
            debug!(device = %self.device_id, locked, %origin, "echoed target set, no command");
            let mut view = self.lock_view();
            view.target_locked = Some(locked);
            view.current_locked = Some(locked);
            return Ok(*view);
        }

        self.lock_view().target_locked = Some(locked);
        let id = self.device_id.as_str();
        let result = if locked {
            self.controller.lock(id).await
        } else {
            self.controller.unlock(id).await
        };
        let state = result?;
        Ok(self.absorb(&state))
    }

    /// Refresh the view from the bridge.
    pub async fn refresh(&self) -> Result<AccessoryView, CoreError> {
        let state = self.controller.current_state(self.device_id.as_str()).await?;
        Ok(self.absorb(&state))
    }

    fn absorb(&self, state: &LockState) -> AccessoryView {
        let mut view = self.lock_view();
        view.current_locked = Some(state.is_locked);
        view.target_locked = Some(state.is_locked);
        view.low_battery = state.battery_critical;
        *view
    }

    fn lock_view(&self) -> std::sync::MutexGuard<'_, AccessoryView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
