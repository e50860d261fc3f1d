// Shared transport configuration for building the bridge HTTP client.
//
// The bridge answers state queries quickly but lock actions only return
// once the motor has moved, so each request picks its own timeout from
// this config instead of a single client-wide value.

use std::path::PathBuf;
use std::time::Duration;

const USER_AGENT: &str = concat!("nukio/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for the bridge client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for lock state queries.
    pub query_timeout: Duration,
    /// Timeout for lock actions (typically much longer than queries).
    pub command_timeout: Duration,
    /// How long a lock state response stays fresh in the cache.
    pub cache_ttl: Duration,
    /// Optional directory mirroring the response cache on disk.
    pub cache_directory: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(45),
            cache_ttl: Duration::from_secs(1),
            cache_directory: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// No client-wide timeout is set; requests apply [`query_timeout`](Self::query_timeout)
    /// or [`command_timeout`](Self::command_timeout) individually.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(self.query_timeout)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
