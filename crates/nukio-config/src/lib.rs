//! Configuration for nukio.
//!
//! A TOML file layered under `NUKIO_` environment variables, API token
//! resolution (env var, keyring, plaintext), validation, and translation
//! into `nukio_core::HubConfig`. The core never reads files itself.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use nukio_core::{
    ActionPriority, BridgeConfig, Device, DeviceClass, HubConfig, LockAction, LockStateMode,
    WebhookConfig,
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

const KEYRING_SERVICE: &str = "nukio";
const KEYRING_ENTRY: &str = "bridge/api-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no bridge API token configured")]
    NoCredentials,

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeSection,

    #[serde(default)]
    pub webhook: WebhookSection,

    #[serde(default)]
    pub locks: Vec<LockEntry>,
}

/// `[bridge]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeSection {
    /// Bridge base URL (e.g., "http://192.168.1.50:8080").
    pub url: Option<String>,

    /// API token in plaintext; the keyring or `api_token_env` take precedence.
    pub api_token: Option<String>,

    /// Environment variable name containing the API token.
    pub api_token_env: Option<String>,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// `0` disables the response cache.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    pub cache_directory: Option<PathBuf>,

    /// "strict" or "relaxed".
    #[serde(default = "default_lock_state_mode")]
    pub lock_state_mode: String,

    #[serde(default = "default_relock_delay_ms")]
    pub relock_delay_ms: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            url: None,
            api_token: None,
            api_token_env: None,
            query_timeout_ms: default_query_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            cache_directory: None,
            lock_state_mode: default_lock_state_mode(),
            relock_delay_ms: default_relock_delay_ms(),
        }
    }
}

fn default_query_timeout_ms() -> u64 {
    5_000
}
fn default_command_timeout_ms() -> u64 {
    45_000
}
fn default_cache_ttl_ms() -> u64 {
    1_000
}
fn default_lock_state_mode() -> String {
    "strict".into()
}
fn default_relock_delay_ms() -> u64 {
    1_000
}

/// `[webhook]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Name or address the bridge uses to reach this host.
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Register the callback URL with the bridge on start.
    #[serde(default = "default_true")]
    pub register: bool,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
            host: None,
            port: default_port(),
            register: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8882
}

/// `[[locks]]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockEntry {
    /// Bridge device id (`nukiId`), number or string.
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,

    pub name: Option<String>,

    #[serde(default)]
    pub door_latch: bool,

    /// Bridge action code forced for lock requests (1-5).
    pub lock_action: Option<u8>,

    /// Bridge action code forced for unlock requests (1-5).
    pub unlock_action: Option<u8>,

    /// "standard" or "lock-n-go".
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "standard".into()
}

fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s.trim().to_owned(),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "nukio", "nukio").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("nukio");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` (or the default path) plus environment.
///
/// A missing file is not an error; defaults and environment still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("NUKIO_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Parse a config from a TOML string, without environment overlays.
pub fn parse_config(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()?;
    Ok(config)
}

// ── Validation ──────────────────────────────────────────────────────

impl Config {
    /// Check everything that can be checked without the bridge.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bridge_url()?;
        self.lock_state_mode()?;

        if self.bridge.query_timeout_ms == 0 {
            return Err(invalid("bridge.query_timeout_ms", "must be greater than 0"));
        }
        if self.bridge.command_timeout_ms == 0 {
            return Err(invalid("bridge.command_timeout_ms", "must be greater than 0"));
        }

        self.webhook_config()?;
        self.devices()?;
        Ok(())
    }

    /// A copy safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.bridge.api_token.is_some() {
            copy.bridge.api_token = Some("********".into());
        }
        copy
    }

    fn bridge_url(&self) -> Result<url::Url, ConfigError> {
        let raw = self
            .bridge
            .url
            .as_deref()
            .ok_or_else(|| invalid("bridge.url", "not set"))?;
        let url: url::Url = raw
            .parse()
            .map_err(|_| invalid("bridge.url", format!("invalid URL: {raw}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                "bridge.url",
                format!("expected http or https, got '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }

    fn lock_state_mode(&self) -> Result<LockStateMode, ConfigError> {
        let raw = &self.bridge.lock_state_mode;
        raw.parse().map_err(|_| {
            invalid(
                "bridge.lock_state_mode",
                format!("expected 'strict' or 'relaxed', got '{raw}'"),
            )
        })
    }

    fn webhook_config(&self) -> Result<WebhookConfig, ConfigError> {
        let section = &self.webhook;
        let bind: IpAddr = section
            .bind
            .parse()
            .map_err(|_| invalid("webhook.bind", format!("not an IP address: {}", section.bind)))?;
        let advertise_host = section
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_owned);
        if section.enabled && section.register && advertise_host.is_none() {
            return Err(invalid(
                "webhook.host",
                "required when webhook.register is true",
            ));
        }
        Ok(WebhookConfig {
            enabled: section.enabled,
            bind,
            port: section.port,
            advertise_host,
            register: section.register,
        })
    }

    fn devices(&self) -> Result<Vec<Device>, ConfigError> {
        let mut seen = HashSet::new();
        self.locks
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let field = |name: &str| format!("locks[{i}].{name}");
                if entry.id.is_empty() {
                    return Err(invalid(field("id"), "must not be empty"));
                }
                if !seen.insert(entry.id.as_str()) {
                    return Err(invalid(field("id"), format!("duplicate id '{}'", entry.id)));
                }
                let action = |code: Option<u8>, name: &str| {
                    code.map(LockAction::try_from)
                        .transpose()
                        .map_err(|e| invalid(field(name), e.to_string()))
                };
                let lock_action = action(entry.lock_action, "lock_action")?;
                let unlock_action = action(entry.unlock_action, "unlock_action")?;
                let priority: ActionPriority = entry.priority.parse().map_err(|_| {
                    invalid(
                        field("priority"),
                        format!("expected 'standard' or 'lock-n-go', got '{}'", entry.priority),
                    )
                })?;
                let class = if entry.door_latch {
                    DeviceClass::DoorLatch
                } else {
                    DeviceClass::StandardLock
                };
                let name = entry.name.clone().unwrap_or_else(|| format!("Lock {}", entry.id));

                Ok(Device::new(entry.id.as_str(), name)
                    .with_class(class)
                    .with_priority(priority)
                    .with_actions(lock_action, unlock_action))
            })
            .collect()
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the bridge API token: env var, then keyring, then plaintext.
pub fn resolve_api_token(bridge: &BridgeSection) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(ref env_name) = bridge.api_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = bridge.api_token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials)
}

// ── Translation ─────────────────────────────────────────────────────

/// Validate and build the runtime configuration.
pub fn to_hub_config(config: &Config) -> Result<HubConfig, ConfigError> {
    config.validate()?;
    let section = &config.bridge;

    let mut bridge = BridgeConfig::new(config.bridge_url()?, resolve_api_token(section)?);
    bridge.query_timeout = Duration::from_millis(section.query_timeout_ms);
    bridge.command_timeout = Duration::from_millis(section.command_timeout_ms);
    bridge.cache_ttl = Duration::from_millis(section.cache_ttl_ms);
    bridge.cache_directory.clone_from(&section.cache_directory);
    bridge.lock_state_mode = config.lock_state_mode()?;
    bridge.relock_delay = Duration::from_millis(section.relock_delay_ms);

    Ok(HubConfig {
        bridge,
        webhook: config.webhook_config()?,
        devices: config.devices()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
        [bridge]
        url = "http://192.168.1.50:8080"
        api_token = "abc123"
        command_timeout_ms = 30000
        lock_state_mode = "relaxed"

        [webhook]
        host = "192.168.1.10"
        port = 9000

        [[locks]]
        id = 12345
        name = "Front Door"
        priority = "lock-n-go"

        [[locks]]
        id = "678"
        name = "Garden Gate"
        door_latch = true
        unlock_action = 3
    "#;

    #[test]
    fn defaults_fill_missing_keys() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.bridge.query_timeout_ms, 5_000);
        assert_eq!(config.bridge.command_timeout_ms, 30_000);
        assert_eq!(config.bridge.cache_ttl_ms, 1_000);
        assert_eq!(config.webhook.bind, "0.0.0.0");
        assert!(config.webhook.enabled);
        assert_eq!(config.locks[1].priority, "standard");
    }

    #[test]
    fn builds_hub_config() {
        let config = parse_config(SAMPLE).unwrap();
        let hub = to_hub_config(&config).unwrap();

        assert_eq!(hub.bridge.url.as_str(), "http://192.168.1.50:8080/");
        assert_eq!(hub.bridge.api_token.expose_secret(), "abc123");
        assert_eq!(hub.bridge.command_timeout, Duration::from_secs(30));
        assert_eq!(hub.bridge.lock_state_mode, LockStateMode::Relaxed);
        assert_eq!(hub.webhook.callback_url(9000).unwrap(), "http://192.168.1.10:9000/");

        assert_eq!(hub.devices.len(), 2);
        let front = &hub.devices[0];
        assert_eq!(front.id.as_str(), "12345");
        assert_eq!(front.resolve_lock_action(), LockAction::LockNGo);
        let gate = &hub.devices[1];
        assert!(gate.is_door_latch());
        assert_eq!(gate.unlock_action, Some(LockAction::Unlatch));
    }

    #[test]
    fn missing_url_rejected() {
        let config = parse_config("[webhook]\nregister = false").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "bridge.url"));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let config = parse_config(
            r#"
            [bridge]
            url = "http://bridge:8080"
            [webhook]
            register = false
            [[locks]]
            id = 1
            [[locks]]
            id = "1"
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate id"));
    }

    #[test]
    fn bad_action_code_rejected() {
        let config = parse_config(
            r#"
            [bridge]
            url = "http://bridge:8080"
            [webhook]
            register = false
            [[locks]]
            id = 1
            lock_action = 9
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "locks[0].lock_action")
        );
    }

    #[test]
    fn unknown_mode_and_priority_rejected() {
        let mut config = parse_config(SAMPLE).unwrap();
        config.bridge.lock_state_mode = "lenient".into();
        assert!(config.validate().is_err());

        let mut config = parse_config(SAMPLE).unwrap();
        config.locks[0].priority = "fastest".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn registering_requires_host() {
        let mut config = parse_config(SAMPLE).unwrap();
        config.webhook.host = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "webhook.host"));

        config.webhook.register = false;
        config.validate().unwrap();
    }

    #[test]
    fn env_var_token_wins_over_plaintext() {
        let section = BridgeSection {
            api_token: Some("plain".into()),
            api_token_env: Some("PATH".into()),
            ..BridgeSection::default()
        };
        let token = resolve_api_token(&section).unwrap();
        assert_eq!(token.expose_secret(), std::env::var("PATH").unwrap());
    }

    #[test]
    fn redaction_hides_token() {
        let config = parse_config(SAMPLE).unwrap().redacted();
        assert_eq!(config.bridge.api_token.as_deref(), Some("********"));
    }

    #[test]
    fn file_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let original = parse_config(SAMPLE).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, toml::to_string_pretty(&original).unwrap()).unwrap();
        let loaded = load_config(Some(path.as_path())).unwrap();

        assert_eq!(loaded.locks.len(), 2);
        assert_eq!(loaded.locks[0].id, "12345");
        assert_eq!(loaded.webhook.port, 9000);
    }
}
