// nukio-core: Lock state synchronization between commands, polls and bridge webhooks.

pub mod accessory;
pub mod bridge;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use accessory::{AccessoryView, HostCallback, HostNotifier, LockAccessory};
pub use bridge::{BridgeReading, CommandAck, LockBridge};
pub use config::{BridgeConfig, HubConfig, WebhookConfig};
pub use controller::{ControllerSettings, LockController};
pub use dispatcher::NotificationDispatcher;
pub use error::CoreError;
pub use hub::Hub;
pub use store::LockStateStore;

pub use model::{
    ActionPriority, ChangeNotification, Device, DeviceClass, DeviceId, LockState, LockStateMode,
    Origin, WebhookEvent,
};

// Wire types consumers need without depending on nukio-api directly.
pub use nukio_api::{BridgeLockState, LockAction};
