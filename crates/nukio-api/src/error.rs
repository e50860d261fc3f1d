use thiserror::Error;

/// Top-level error type for the `nukio-api` crate.
///
/// Covers every failure mode of the bridge HTTP API and the webhook
/// listener. `nukio-core` maps these into the domain taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A state query did not complete within the query timeout.
    #[error("Bridge request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A lock action was sent but no confirmation arrived in time.
    /// The actual outcome on the device is unknown.
    #[error("Lock action unconfirmed after {timeout_ms}ms")]
    CommandTimeout { timeout_ms: u64 },

    // ── Bridge API ──────────────────────────────────────────────────
    /// The bridge rejected the API token (HTTP 401).
    #[error("Bridge rejected the API token")]
    Unauthorized,

    /// The bridge does not know the requested device (HTTP 404).
    #[error("Bridge does not know device {device_id}")]
    UnknownDevice { device_id: String },

    /// Any other non-success HTTP status.
    #[error("Bridge API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The bridge answered a lock action with `"success": false`.
    #[error("Bridge rejected lock action {action} for device {device_id}")]
    ActionRejected { device_id: String, action: u8 },

    /// The bridge answered a query with a well-formed but unusable body.
    #[error("Bad bridge response: {message}")]
    BadResponse { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Webhook listener ────────────────────────────────────────────
    /// A webhook body that is not a valid bridge notification.
    #[error("Malformed webhook notification: {message}")]
    MalformedNotification { message: String, body: String },

    /// The webhook listener could not bind its socket.
    #[error("Cannot bind webhook listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Local I/O failure (cache directory, listener runtime).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the outcome of the request is unknown rather than failed.
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, Self::CommandTimeout { .. })
    }

    /// HTTP status reported by the bridge, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Unauthorized => Some(401),
            Self::UnknownDevice { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
