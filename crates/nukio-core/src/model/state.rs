// ── Lock state and its provenance ──
//
// Every state value carries the time it was observed and the source that
// produced it. The store orders updates by that pair.

use chrono::{DateTime, Utc};
use nukio_api::BridgeLockState;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::device::DeviceId;

// ── Origin ──────────────────────────────────────────────────────────

/// Where a state change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Origin {
    /// A confirmed command this process sent.
    Command,
    /// A state query against the bridge.
    Poll,
    /// A push notification from the bridge.
    Webhook,
    /// The door-latch spring-back timer.
    Relock,
}

impl Origin {
    /// Changes the host must reflect without treating them as user intent.
    pub fn is_background(self) -> bool {
        matches!(self, Self::Webhook | Self::Relock)
    }

    /// Precedence among updates carrying the same timestamp.
    pub(crate) fn tie_rank(self) -> u8 {
        match self {
            Self::Poll => 0,
            Self::Command => 1,
            Self::Webhook | Self::Relock => 2,
        }
    }
}

// ── LockState ───────────────────────────────────────────────────────

/// The stored view of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockState {
    pub is_locked: bool,
    pub battery_critical: bool,
    pub last_updated: DateTime<Utc>,
    pub source: Origin,
}

impl LockState {
    pub fn new(
        is_locked: bool,
        battery_critical: bool,
        last_updated: DateTime<Utc>,
        source: Origin,
    ) -> Self {
        Self {
            is_locked,
            battery_critical,
            last_updated,
            source,
        }
    }

    /// Whether `self` should replace `current`.
    ///
    /// Newer timestamps win. On a tie the higher-ranked source wins, and
    /// between equal ranks the later arrival wins.
    pub fn supersedes(&self, current: Option<&LockState>) -> bool {
        let Some(current) = current else {
            return true;
        };
        match self.last_updated.cmp(&current.last_updated) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.source.tie_rank() >= current.source.tie_rank(),
        }
    }

    /// Whether the host-visible part of the state differs.
    pub fn differs_from(&self, other: &LockState) -> bool {
        self.is_locked != other.is_locked || self.battery_critical != other.battery_critical
    }
}

// ── LockStateMode ───────────────────────────────────────────────────

/// How bridge state codes translate to locked / unlocked.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LockStateMode {
    /// Locked only when the bridge reports `locked`.
    #[default]
    Strict,
    /// Locked unless the bolt is retracted or retracting.
    Relaxed,
}

impl LockStateMode {
    pub fn is_locked(self, state: BridgeLockState) -> bool {
        match self {
            Self::Strict => state == BridgeLockState::Locked,
            Self::Relaxed => !state.is_open(),
        }
    }
}

// ── Webhook event ───────────────────────────────────────────────────

/// A bridge notification translated into domain terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub device_id: DeviceId,
    pub is_locked: bool,
    pub battery_critical: bool,
    pub received_at: DateTime<Utc>,
}

impl WebhookEvent {
    pub fn from_bridge(event: &nukio_api::WebhookEvent, mode: LockStateMode) -> Self {
        Self {
            device_id: DeviceId::new(event.device_id.clone()),
            is_locked: mode.is_locked(event.state),
            battery_critical: event.battery_critical,
            received_at: event.received_at,
        }
    }

    pub(crate) fn as_state(&self) -> LockState {
        LockState::new(
            self.is_locked,
            self.battery_critical,
            self.received_at,
            Origin::Webhook,
        )
    }
}

// ── ChangeNotification ──────────────────────────────────────────────

/// Delivered to the host when a background source changed a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeNotification {
    pub device_id: DeviceId,
    pub is_locked: bool,
    pub battery_critical: bool,
    pub origin: Origin,
}

impl ChangeNotification {
    pub(crate) fn new(device_id: DeviceId, state: &LockState) -> Self {
        Self {
            device_id,
            is_locked: state.is_locked,
            battery_critical: state.battery_critical,
            origin: state.source,
        }
    }

    /// Whether the host must treat this as an echo rather than a request.
    pub fn is_background(&self) -> bool {
        self.origin.is_background()
    }
}
