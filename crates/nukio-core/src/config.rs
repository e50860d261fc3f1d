// ── Runtime hub configuration ──
//
// These types describe how to reach the bridge and where to listen for
// its callbacks. They carry secrets and tuning but never touch disk; the
// config crate builds a `HubConfig` and hands it in.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use nukio_api::TransportConfig;
use secrecy::SecretString;
use url::Url;

use crate::controller::ControllerSettings;
use crate::model::{Device, LockStateMode};

/// How to talk to the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge root, e.g. `http://192.168.1.50:8080`.
    pub url: Url,
    pub api_token: SecretString,
    pub query_timeout: Duration,
    pub command_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_directory: Option<PathBuf>,
    pub lock_state_mode: LockStateMode,
    pub relock_delay: Duration,
}

impl BridgeConfig {
    /// Defaults for everything but the address and token.
    pub fn new(url: Url, api_token: SecretString) -> Self {
        let transport = TransportConfig::default();
        Self {
            url,
            api_token,
            query_timeout: transport.query_timeout,
            command_timeout: transport.command_timeout,
            cache_ttl: transport.cache_ttl,
            cache_directory: None,
            lock_state_mode: LockStateMode::default(),
            relock_delay: Duration::from_secs(1),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            query_timeout: self.query_timeout,
            command_timeout: self.command_timeout,
            cache_ttl: self.cache_ttl,
            cache_directory: self.cache_directory.clone(),
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            command_timeout: self.command_timeout,
            relock_delay: self.relock_delay,
            lock_state_mode: self.lock_state_mode,
        }
    }
}

/// Where the webhook listener binds and what URL the bridge is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub bind: IpAddr,
    /// `0` picks an ephemeral port.
    pub port: u16,
    /// Host name or address the bridge can reach this process on.
    pub advertise_host: Option<String>,
    /// Register the callback URL with the bridge on start.
    pub register: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8882,
            advertise_host: None,
            register: true,
        }
    }
}

impl WebhookConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Callback URL for the port actually bound.
    pub fn callback_url(&self, bound_port: u16) -> Option<String> {
        self.advertise_host
            .as_deref()
            .map(|host| format!("http://{host}:{bound_port}/"))
    }
}

/// Everything the hub needs to run.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bridge: BridgeConfig,
    pub webhook: WebhookConfig,
    pub devices: Vec<Device>,
}
