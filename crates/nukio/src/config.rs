//! Config file resolution for the binary and translation into a `Hub`.
//!
//! Loading, validation and secret lookup live in `nukio-config`; this
//! module only decides which file to read and reports a missing one.

use std::path::PathBuf;

use nukio_config::Config;
use nukio_core::Hub;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// `--config` / `NUKIO_CONFIG`, else the platform default.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(nukio_config::config_path)
}

/// Load the layered config. A missing file yields defaults.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = resolve_path(global);
    Ok(nukio_config::load_config(Some(&path))?)
}

/// Load, validate and assemble a hub (listener not started).
pub fn build_hub(global: &GlobalOpts, adjust: impl FnOnce(&mut Config)) -> Result<Hub, CliError> {
    let path = resolve_path(global);
    let mut cfg = nukio_config::load_config(Some(&path))?;

    if cfg.bridge.url.is_none() && !path.exists() {
        return Err(CliError::NoConfig {
            path: path.display().to_string(),
        });
    }

    adjust(&mut cfg);
    let hub_config = nukio_config::to_hub_config(&cfg)?;
    tracing::debug!(
        path = %path.display(),
        bridge = %hub_config.bridge.url,
        locks = hub_config.devices.len(),
        "configuration loaded"
    );
    Ok(Hub::new(hub_config)?)
}
