// ── Device identity and command policy ──
//
// A `Device` is built once from configuration and never changes while the
// process runs. It decides which bridge action a lock or unlock request
// turns into.

use std::borrow::Borrow;
use std::fmt;

use nukio_api::LockAction;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── DeviceId ────────────────────────────────────────────────────────

/// Bridge-assigned device identifier (`nukiId`), kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Classification ──────────────────────────────────────────────────

/// How a device behaves when locked and unlocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    /// Motorized bolt: both directions are real bridge actions.
    #[default]
    StandardLock,
    /// Spring latch: locking is a rest state, unlocking springs back.
    DoorLatch,
}

/// Which family of bridge actions a device prefers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ActionPriority {
    #[default]
    Standard,
    LockNGo,
}

// ── Device ──────────────────────────────────────────────────────────

/// A configured lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub class: DeviceClass,
    pub priority: ActionPriority,
    /// Forces a specific bridge action for lock requests.
    pub lock_action: Option<LockAction>,
    /// Forces a specific bridge action for unlock requests.
    pub unlock_action: Option<LockAction>,
}

impl Device {
    /// A standard lock with default priority and no overrides.
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class: DeviceClass::StandardLock,
            priority: ActionPriority::Standard,
            lock_action: None,
            unlock_action: None,
        }
    }

    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_priority(mut self, priority: ActionPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_actions(mut self, lock: Option<LockAction>, unlock: Option<LockAction>) -> Self {
        self.lock_action = lock;
        self.unlock_action = unlock;
        self
    }

    pub fn is_door_latch(&self) -> bool {
        self.class == DeviceClass::DoorLatch
    }

    /// Bridge action sent for a lock request.
    pub fn resolve_lock_action(&self) -> LockAction {
        self.lock_action.unwrap_or(match self.priority {
            ActionPriority::Standard => LockAction::Lock,
            ActionPriority::LockNGo => LockAction::LockNGo,
        })
    }

    /// Bridge action sent for an unlock request.
    pub fn resolve_unlock_action(&self) -> LockAction {
        self.unlock_action.unwrap_or(match (self.priority, self.class) {
            (_, DeviceClass::StandardLock) => LockAction::Unlock,
            (ActionPriority::Standard, DeviceClass::DoorLatch) => LockAction::Unlatch,
            (ActionPriority::LockNGo, DeviceClass::DoorLatch) => LockAction::LockNGoWithUnlatch,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn standard_priority_actions() {
        let lock = Device::new("1", "Front");
        assert_eq!(lock.resolve_lock_action(), LockAction::Lock);
        assert_eq!(lock.resolve_unlock_action(), LockAction::Unlock);

        let latch = Device::new("2", "Gate").with_class(DeviceClass::DoorLatch);
        assert_eq!(latch.resolve_unlock_action(), LockAction::Unlatch);
    }

    #[test]
    fn lock_n_go_priority_actions() {
        let lock = Device::new("1", "Front").with_priority(ActionPriority::LockNGo);
        assert_eq!(lock.resolve_lock_action(), LockAction::LockNGo);
        assert_eq!(lock.resolve_unlock_action(), LockAction::Unlock);

        let latch = lock.with_class(DeviceClass::DoorLatch);
        assert_eq!(latch.resolve_unlock_action(), LockAction::LockNGoWithUnlatch);
    }

    #[test]
    fn explicit_overrides_win() {
        let lock = Device::new("1", "Front")
            .with_priority(ActionPriority::LockNGo)
            .with_actions(Some(LockAction::Lock), Some(LockAction::Unlatch));
        assert_eq!(lock.resolve_lock_action(), LockAction::Lock);
        assert_eq!(lock.resolve_unlock_action(), LockAction::Unlatch);
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("Lock-N-Go".parse::<ActionPriority>().unwrap(), ActionPriority::LockNGo);
        assert_eq!(ActionPriority::LockNGo.to_string(), "lock-n-go");
        assert!("fastest".parse::<ActionPriority>().is_err());
    }
}
