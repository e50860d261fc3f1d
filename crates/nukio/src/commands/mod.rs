//! Command dispatch: CLI args -> hub operations -> output formatting.

pub mod callbacks;
pub mod config_cmd;
pub mod lock;
pub mod serve;
pub mod status;

use nukio_core::{Device, Hub};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a bridge-bound command to its handler.
pub async fn dispatch(cmd: Command, hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(hub, args, global).await,
        Command::Lock(args) => lock::handle(hub, args, true, global).await,
        Command::Unlock(args) => lock::handle(hub, args, false, global).await,
        Command::Callbacks(args) => callbacks::handle(hub, args, global).await,
        // Handled before a hub is built
        Command::Serve(_) | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Find a configured lock by exact id, else by case-insensitive name.
pub fn find_lock<'a>(devices: &[&'a Device], query: &str) -> Result<&'a Device, CliError> {
    if let Some(device) = devices.iter().copied().find(|d| d.id.as_str() == query) {
        return Ok(device);
    }

    let mut by_name = devices
        .iter()
        .copied()
        .filter(|d| d.name.eq_ignore_ascii_case(query));
    match (by_name.next(), by_name.next()) {
        (Some(device), None) => Ok(device),
        (Some(_), Some(_)) => Err(CliError::Validation {
            field: "lock".into(),
            reason: format!("name '{query}' matches more than one lock; use the id"),
        }),
        (None, _) => Err(CliError::NotFound {
            resource_type: "lock".into(),
            identifier: query.to_owned(),
            list_command: "status".into(),
        }),
    }
}
