//! `nukio status`: read lock state through the controller.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tabled::Tabled;

use nukio_core::{Device, DeviceClass, Hub, LockState, Origin};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::find_lock;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LockStatus {
    id: String,
    name: String,
    class: DeviceClass,
    locked: Option<bool>,
    battery_critical: Option<bool>,
    last_updated: Option<DateTime<Utc>>,
    source: Option<Origin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl LockStatus {
    fn new(device: &Device, result: Result<LockState, String>) -> Self {
        let (state, error) = match result {
            Ok(state) => (Some(state), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            id: device.id.to_string(),
            name: device.name.clone(),
            class: device.class,
            locked: state.map(|s| s.is_locked),
            battery_critical: state.map(|s| s.battery_critical),
            last_updated: state.map(|s| s.last_updated),
            source: state.map(|s| s.source),
            error,
        }
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    class: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn row(s: &LockStatus, color: bool) -> StatusRow {
    StatusRow {
        id: s.id.clone(),
        name: s.name.clone(),
        class: s.class.to_string(),
        state: s
            .error
            .clone()
            .unwrap_or_else(|| output::lock_label(s.locked, color)),
        battery: output::battery_label(s.battery_critical, color),
        updated: s.last_updated.map_or_else(|| "-".into(), local_time),
    }
}

fn detail(s: &LockStatus, color: bool) -> String {
    let mut lines = vec![
        format!("ID:       {}", s.id),
        format!("Name:     {}", s.name),
        format!("Type:     {}", s.class),
        format!("State:    {}", output::lock_label(s.locked, color)),
        format!("Battery:  {}", output::battery_label(s.battery_critical, color)),
    ];
    if let Some(at) = s.last_updated {
        lines.push(format!("Updated:  {}", local_time(at)));
    }
    if let Some(source) = s.source {
        lines.push(format!("Source:   {source}"));
    }
    lines.join("\n")
}

fn plain(s: &LockStatus) -> String {
    format!("{}\t{}", s.id, output::lock_label(s.locked, false))
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(hub: &Hub, args: StatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = hub.controller();
    let devices = controller.devices();
    let color = output::should_color();

    if let Some(query) = args.lock {
        let device = find_lock(&devices, &query)?;
        let state = controller.current_state(device.id.as_str()).await?;
        let status = LockStatus::new(device, Ok(state));
        let out = output::render_single(global.output, &status, |s| detail(s, color), plain)?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    // One unreachable lock should not hide the others.
    let mut report = Vec::with_capacity(devices.len());
    for device in devices {
        let result = controller.current_state(device.id.as_str()).await;
        if let Err(ref e) = result {
            tracing::warn!(device = %device.id, error = %e, "state query failed");
        }
        report.push(LockStatus::new(device, result.map_err(|e| e.to_string())));
    }

    let out = output::render_list(global.output, &report, |s| row(s, color), plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
