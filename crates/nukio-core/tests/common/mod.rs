#![allow(clippy::unwrap_used, dead_code)]
// Shared fixtures for nukio-core integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use nukio_core::{
    BridgeLockState, BridgeReading, ChangeNotification, CommandAck, ControllerSettings, CoreError,
    Device, DeviceClass, HostNotifier, LockAction, LockBridge, LockController, LockStateStore,
};

// ── Scripted bridge ─────────────────────────────────────────────────

/// What the fake answers to the next lock action.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Ack { battery_critical: bool },
    Timeout,
    Unreachable,
    Rejected,
}

pub struct FakeBridge {
    commands: AtomicUsize,
    queries: AtomicUsize,
    invalidations: AtomicUsize,
    script: Mutex<Script>,
    command_delay: Mutex<Duration>,
    reading: Mutex<Option<BridgeReading>>,
    sent: Mutex<Vec<(String, LockAction)>>,
    callbacks: Mutex<Vec<String>>,
}

impl Default for FakeBridge {
    fn default() -> Self {
        Self {
            commands: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
            script: Mutex::new(Script::Ack {
                battery_critical: false,
            }),
            command_delay: Mutex::new(Duration::from_millis(50)),
            reading: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            callbacks: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn delay_commands(&self, delay: Duration) {
        *self.command_delay.lock().unwrap() = delay;
    }

    pub fn report(&self, state: BridgeLockState, battery_critical: bool, fetched_at: DateTime<Utc>) {
        *self.reading.lock().unwrap() = Some(BridgeReading {
            state,
            battery_critical,
            fetched_at,
        });
    }

    pub fn command_count(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, LockAction)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn callbacks(&self) -> Vec<String> {
        self.callbacks.lock().unwrap().clone()
    }
}

impl LockBridge for FakeBridge {
    async fn query(&self, device_id: &str) -> Result<BridgeReading, CoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let reading = *self.reading.lock().unwrap();
        reading.ok_or_else(|| CoreError::BridgeUnreachable {
            reason: format!("no scripted reading for {device_id}"),
        })
    }

    async fn send_command(
        &self,
        device_id: &str,
        action: LockAction,
        timeout: Duration,
    ) -> Result<CommandAck, CoreError> {
        self.commands.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push((device_id.to_owned(), action));
        let delay = *self.command_delay.lock().unwrap();
        let script = *self.script.lock().unwrap();

        tokio::time::sleep(delay.min(timeout)).await;
        match script {
            Script::Ack { battery_critical } => Ok(CommandAck { battery_critical }),
            Script::Timeout => Err(CoreError::CommandTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            }),
            Script::Unreachable => Err(CoreError::BridgeUnreachable {
                reason: "connection refused".into(),
            }),
            Script::Rejected => Err(CoreError::Rejected {
                message: format!("action {} refused", action.code()),
            }),
        }
    }

    fn invalidate(&self, _device_id: &str) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    async fn ensure_callback(&self, url: &str) -> Result<bool, CoreError> {
        let mut callbacks = self.callbacks.lock().unwrap();
        if callbacks.iter().any(|c| c == url) {
            return Ok(false);
        }
        callbacks.push(url.to_owned());
        Ok(true)
    }
}

// ── Assembly ────────────────────────────────────────────────────────

pub const RELOCK_DELAY: Duration = Duration::from_secs(1);

pub fn devices() -> Vec<Device> {
    vec![
        Device::new("100", "Front Door"),
        Device::new("200", "Garden Gate").with_class(DeviceClass::DoorLatch),
    ]
}

pub struct Rig {
    pub bridge: Arc<FakeBridge>,
    pub store: Arc<LockStateStore>,
    pub notifier: Arc<HostNotifier>,
    pub controller: Arc<LockController<FakeBridge>>,
    pub cancel: CancellationToken,
}

pub fn rig() -> Rig {
    rig_with(devices())
}

pub fn rig_with(devices: Vec<Device>) -> Rig {
    let bridge = FakeBridge::new();
    let store = Arc::new(LockStateStore::new(devices.iter().map(|d| &d.id)));
    let notifier = Arc::new(HostNotifier::new());
    let cancel = CancellationToken::new();
    let controller = Arc::new(LockController::new(
        Arc::clone(&bridge),
        Arc::clone(&store),
        Arc::clone(&notifier),
        devices,
        ControllerSettings {
            command_timeout: Duration::from_secs(10),
            relock_delay: RELOCK_DELAY,
            ..ControllerSettings::default()
        },
        cancel.clone(),
    ));
    Rig {
        bridge,
        store,
        notifier,
        controller,
        cancel,
    }
}

/// Collect every notification delivered for `device_id`.
pub fn capture(notifier: &HostNotifier, device_id: &str) -> mpsc::UnboundedReceiver<ChangeNotification> {
    let (tx, rx) = mpsc::unbounded_channel();
    notifier.register(device_id, move |n: &ChangeNotification| {
        let _ = tx.send(n.clone());
    });
    rx
}

pub fn bridge_event(
    device_id: &str,
    state: BridgeLockState,
    battery_critical: bool,
    received_at: DateTime<Utc>,
) -> nukio_api::WebhookEvent {
    nukio_api::WebhookEvent {
        device_id: device_id.to_owned(),
        state,
        state_name: None,
        battery_critical,
        received_at,
    }
}
