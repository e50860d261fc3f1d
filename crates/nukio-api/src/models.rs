// Bridge API response types
//
// Models for the Nuki Bridge JSON API and its webhook payload. Fields use
// `#[serde(default)]` where bridge firmware versions disagree about
// presence. Unknown webhook fields are kept in `WebhookPayload::extra`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ── Lock state codes ─────────────────────────────────────────────────

/// Lock state as reported by the bridge (`state` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum BridgeLockState {
    Uncalibrated,
    Locked,
    Unlocking,
    Unlocked,
    Locking,
    Unlatched,
    UnlockedLockNGo,
    Unlatching,
    MotorBlocked,
    Undefined,
    /// A code this client does not know yet.
    Other(u8),
}

impl BridgeLockState {
    pub fn code(self) -> u8 {
        match self {
            Self::Uncalibrated => 0,
            Self::Locked => 1,
            Self::Unlocking => 2,
            Self::Unlocked => 3,
            Self::Locking => 4,
            Self::Unlatched => 5,
            Self::UnlockedLockNGo => 6,
            Self::Unlatching => 7,
            Self::MotorBlocked => 254,
            Self::Undefined => 255,
            Self::Other(code) => code,
        }
    }

    /// Whether the bolt is (or is moving towards being) retracted.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            Self::Unlocking
                | Self::Unlocked
                | Self::Unlatched
                | Self::UnlockedLockNGo
                | Self::Unlatching
        )
    }
}

impl From<u8> for BridgeLockState {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Uncalibrated,
            1 => Self::Locked,
            2 => Self::Unlocking,
            3 => Self::Unlocked,
            4 => Self::Locking,
            5 => Self::Unlatched,
            6 => Self::UnlockedLockNGo,
            7 => Self::Unlatching,
            254 => Self::MotorBlocked,
            255 => Self::Undefined,
            other => Self::Other(other),
        }
    }
}

impl From<BridgeLockState> for u8 {
    fn from(state: BridgeLockState) -> Self {
        state.code()
    }
}

// ── Lock actions ─────────────────────────────────────────────────────

/// Lock action accepted by `/lockAction` (`action` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LockAction {
    Unlock,
    Lock,
    Unlatch,
    LockNGo,
    LockNGoWithUnlatch,
}

impl LockAction {
    pub fn code(self) -> u8 {
        match self {
            Self::Unlock => 1,
            Self::Lock => 2,
            Self::Unlatch => 3,
            Self::LockNGo => 4,
            Self::LockNGoWithUnlatch => 5,
        }
    }
}

impl TryFrom<u8> for LockAction {
    type Error = InvalidActionCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Unlock),
            2 => Ok(Self::Lock),
            3 => Ok(Self::Unlatch),
            4 => Ok(Self::LockNGo),
            5 => Ok(Self::LockNGoWithUnlatch),
            other => Err(InvalidActionCode(other)),
        }
    }
}

impl From<LockAction> for u8 {
    fn from(action: LockAction) -> Self {
        action.code()
    }
}

impl fmt::Display for LockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unlock => "unlock",
            Self::Lock => "lock",
            Self::Unlatch => "unlatch",
            Self::LockNGo => "lock-n-go",
            Self::LockNGoWithUnlatch => "lock-n-go-unlatch",
        };
        f.write_str(name)
    }
}

/// A numeric action code outside the range the bridge accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid lock action code {0} (expected 1-5)")]
pub struct InvalidActionCode(pub u8);

// ── Responses ────────────────────────────────────────────────────────

/// Body of `GET /lockState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStateResponse {
    pub state: BridgeLockState,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub battery_critical: bool,
    #[serde(default = "default_success")]
    pub success: bool,
}

/// Body of `POST /lockAction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockActionResponse {
    pub success: bool,
    #[serde(default)]
    pub battery_critical: bool,
}

/// A callback URL registered on the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub id: u32,
    pub url: String,
}

/// Body of `GET /callback/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackList {
    #[serde(default)]
    pub callbacks: Vec<Callback>,
}

/// Body of `GET /callback/add` and `GET /callback/remove`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

// ── Webhook payload ──────────────────────────────────────────────────

/// Notification body the bridge POSTs to registered callback URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Bridge-assigned device id. Sent as a number, kept as a string.
    #[serde(deserialize_with = "device_id_from_any")]
    pub nuki_id: String,
    pub state: BridgeLockState,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub battery_critical: bool,
    /// Catch-all for fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn device_id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n.to_string()),
        RawId::Text(s) if !s.trim().is_empty() => Ok(s.trim().to_owned()),
        RawId::Text(_) => Err(serde::de::Error::custom("empty nukiId")),
    }
}
