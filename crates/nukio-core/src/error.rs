// ── Core error types ──
//
// Domain errors from nukio-core. Consumers never see HTTP status codes or
// JSON parse failures directly; the `From<nukio_api::Error>` impl folds
// transport-layer errors into the lock-sync taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Bridge communication ─────────────────────────────────────────
    /// Transport failure or query timeout. The caller may retry.
    #[error("Bridge unreachable: {reason}")]
    BridgeUnreachable { reason: String },

    /// The bridge answered with something unusable.
    #[error("Bad bridge response: {message}")]
    BadResponse { message: String },

    /// A lock action was sent but never confirmed. The device may or may
    /// not have moved; the stored state is left as it was.
    #[error("Lock action unconfirmed after {timeout_ms}ms")]
    CommandTimeout { timeout_ms: u64 },

    #[error("Bridge rejected the API token")]
    Unauthorized,

    #[error("Bridge rejected the action: {message}")]
    Rejected { message: String },

    // ── Device state ─────────────────────────────────────────────────
    /// Another command for the same device is still outstanding.
    #[error("A command for {device_id} is already in flight")]
    CommandInFlight { device_id: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    /// The device is configured but no state has been observed yet.
    #[error("No state known yet for {device_id}")]
    StateUnknown { device_id: String },

    // ── Webhook ──────────────────────────────────────────────────────
    #[error("Malformed webhook notification: {message}")]
    MalformedWebhook { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BridgeUnreachable { .. } | Self::CommandInFlight { .. }
        )
    }

    /// Whether the outcome of a command is unknown rather than failed.
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, Self::CommandTimeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nukio_api::Error> for CoreError {
    fn from(err: nukio_api::Error) -> Self {
        match err {
            nukio_api::Error::Transport(e) => CoreError::BridgeUnreachable {
                reason: e.to_string(),
            },
            e @ nukio_api::Error::Timeout { .. } => CoreError::BridgeUnreachable {
                reason: e.to_string(),
            },
            nukio_api::Error::CommandTimeout { timeout_ms } => CoreError::CommandTimeout { timeout_ms },
            nukio_api::Error::Unauthorized => CoreError::Unauthorized,
            nukio_api::Error::UnknownDevice { device_id } => CoreError::DeviceNotFound {
                identifier: device_id,
            },
            nukio_api::Error::ActionRejected { device_id, action } => CoreError::Rejected {
                message: format!("action {action} refused for {device_id}"),
            },
            nukio_api::Error::Api { status, message } => CoreError::BadResponse {
                message: if message.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {message}")
                },
            },
            nukio_api::Error::BadResponse { message } => CoreError::BadResponse { message },
            nukio_api::Error::Deserialization { message, body: _ } => {
                CoreError::BadResponse { message }
            }
            nukio_api::Error::MalformedNotification { message, body: _ } => {
                CoreError::MalformedWebhook { message }
            }
            nukio_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid bridge URL: {e}"),
            },
            e @ nukio_api::Error::Bind { .. } => CoreError::Config {
                message: e.to_string(),
            },
            nukio_api::Error::Io(e) => CoreError::Internal(format!("I/O error: {e}")),
        }
    }
}
