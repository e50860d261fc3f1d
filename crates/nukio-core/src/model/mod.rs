// ── Domain model ──

pub mod device;
pub mod state;

pub use device::{ActionPriority, Device, DeviceClass, DeviceId};
pub use state::{ChangeNotification, LockState, LockStateMode, Origin, WebhookEvent};
