//! `nukio serve`: run the hub until interrupted.

use tracing::{info, warn};

use nukio_core::ChangeNotification;

use crate::cli::{GlobalOpts, ServeArgs};
use crate::config;
use crate::error::CliError;

fn log_notification(n: &ChangeNotification) {
    info!(
        device = %n.device_id,
        locked = n.is_locked,
        battery_critical = n.battery_critical,
        origin = %n.origin,
        "host notified"
    );
}

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ServeArgs { port, no_register } = args;
    let hub = config::build_hub(global, |cfg| {
        if let Some(port) = port {
            cfg.webhook.port = port;
        }
        if no_register {
            cfg.webhook.register = false;
        }
    })?;

    let ids: Vec<String> = hub
        .controller()
        .devices()
        .iter()
        .map(|d| d.id.to_string())
        .collect();

    let mut accessories = Vec::with_capacity(ids.len());
    for id in &ids {
        hub.notifier().register(id.as_str(), log_notification);
        accessories.push(hub.accessory(id)?);
    }

    // Seed every view; an unreachable lock is filled in by its first webhook.
    for accessory in &accessories {
        match accessory.refresh().await {
            Ok(view) => info!(
                device = %accessory.device_id(),
                locked = ?view.current_locked,
                low_battery = view.low_battery,
                "initial state"
            ),
            Err(e) => warn!(device = %accessory.device_id(), error = %e, "initial state unavailable"),
        }
    }

    match hub.start().await? {
        Some(addr) => info!(%addr, "webhook listener running"),
        None => warn!("webhook listener disabled, state changes only through commands"),
    }
    if !global.quiet {
        eprintln!("nukio serving {} lock(s), press Ctrl-C to stop", ids.len());
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    hub.shutdown().await;
    Ok(())
}
