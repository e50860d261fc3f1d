//! `nukio lock` / `nukio unlock`.

use serde::Serialize;

use nukio_core::{Hub, LockState};

use crate::cli::{GlobalOpts, LockArgs};
use crate::error::CliError;
use crate::output;

use super::find_lock;

#[derive(Debug, Serialize)]
struct CommandResult {
    id: String,
    name: String,
    #[serde(flatten)]
    state: LockState,
}

pub async fn handle(
    hub: &Hub,
    args: LockArgs,
    locked: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = hub.controller();
    let devices = controller.devices();
    let device = find_lock(&devices, &args.lock)?;
    let id = device.id.as_str();

    let state = if locked {
        controller.lock(id).await?
    } else {
        controller.unlock(id).await?
    };

    let result = CommandResult {
        id: device.id.to_string(),
        name: device.name.clone(),
        state,
    };
    let color = output::should_color();
    let out = output::render_single(
        global.output,
        &result,
        |r| {
            format!(
                "{} ({}): {}",
                r.name,
                r.id,
                output::lock_label(Some(r.state.is_locked), color)
            )
        },
        |r| output::lock_label(Some(r.state.is_locked), false),
    )?;
    output::print_output(&out, global.quiet);

    if device.is_door_latch() && !locked {
        tracing::info!(device = %device.id, "door latch re-locks on its own");
    }
    Ok(())
}
