//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use nukio_config::ConfigError;
use nukio_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the bridge: {reason}")]
    #[diagnostic(
        code(nukio::connection_failed),
        help(
            "Check that the bridge is powered on and its HTTP API is enabled.\n\
             Try: nukio config show"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("The bridge rejected the API token")]
    #[diagnostic(
        code(nukio::auth_failed),
        help("Compare bridge.api_token with the token shown in the Nuki app under Bridge > Manage.")
    )]
    AuthFailed,

    #[error("No bridge API token configured")]
    #[diagnostic(
        code(nukio::no_credentials),
        help(
            "Set bridge.api_token or bridge.api_token_env in the config file,\n\
             or store it in the system keyring as nukio / bridge/api-token."
        )
    )]
    NoCredentials,

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(nukio::not_found),
        help("Run: nukio {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("A command for lock {device_id} is already in flight")]
    #[diagnostic(
        code(nukio::busy),
        help("Wait for the pending command to finish and try again.")
    )]
    Busy { device_id: String },

    // ── Bridge ───────────────────────────────────────────────────────

    #[error("Bridge error ({code}): {message}")]
    #[diagnostic(code(nukio::bridge_error))]
    BridgeError { code: String, message: String },

    #[error("Lock action not confirmed within {timeout_ms}ms")]
    #[diagnostic(
        code(nukio::unconfirmed),
        help(
            "The lock may or may not have moved.\n\
             Run: nukio status to read its current state."
        )
    )]
    Unconfirmed { timeout_ms: u64 },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nukio::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found")]
    #[diagnostic(
        code(nukio::no_config),
        help(
            "Create one with at least [bridge] url and api_token.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Could not load configuration: {message}")]
    #[diagnostic(code(nukio::config))]
    ConfigLoad { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(nukio::json))]
    Json(#[from] serde_json::Error),

    #[error("TOML output failed: {0}")]
    #[diagnostic(code(nukio::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::NoCredentials => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Busy { .. } => exit_code::CONFLICT,
            Self::Unconfirmed { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::BridgeUnreachable { reason } => CliError::ConnectionFailed { reason },

            CoreError::Unauthorized => CliError::AuthFailed,

            CoreError::CommandTimeout { timeout_ms } => CliError::Unconfirmed { timeout_ms },

            CoreError::CommandInFlight { device_id } => CliError::Busy { device_id },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "lock".into(),
                identifier,
                list_command: "status".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::BadResponse { message } => CliError::BridgeError {
                code: "bad_response".into(),
                message,
            },

            CoreError::Rejected { message } => CliError::BridgeError {
                code: "rejected".into(),
                message,
            },

            err @ CoreError::StateUnknown { .. } => CliError::BridgeError {
                code: "state_unknown".into(),
                message: err.to_string(),
            },

            CoreError::MalformedWebhook { message } => CliError::BridgeError {
                code: "malformed_webhook".into(),
                message,
            },

            CoreError::Internal(message) => CliError::BridgeError {
                code: "internal".into(),
                message,
            },
        }
    }
}

impl From<nukio_api::Error> for CliError {
    fn from(err: nukio_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials => CliError::NoCredentials,
            ConfigError::Figment(e) => CliError::ConfigLoad {
                message: e.to_string(),
            },
        }
    }
}
