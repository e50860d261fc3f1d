//! Output formatting: table, JSON, plain.
//!
//! Table uses `tabled`, JSON serializes the underlying data via serde,
//! plain emits one line per item for scripts.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Color only when writing to a terminal and `NO_COLOR` is unset.
pub fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// "locked" / "unlocked" / "unknown", colored for tables.
pub fn lock_label(locked: Option<bool>, color: bool) -> String {
    let label = match locked {
        Some(true) => "locked",
        Some(false) => "unlocked",
        None => "unknown",
    };
    if !color {
        return label.to_owned();
    }
    match locked {
        Some(true) => label.green().to_string(),
        Some(false) => label.yellow().to_string(),
        None => label.dimmed().to_string(),
    }
}

pub fn battery_label(critical: Option<bool>, color: bool) -> String {
    match critical {
        Some(true) if color => "LOW".red().bold().to_string(),
        Some(true) => "LOW".to_owned(),
        Some(false) => "ok".to_owned(),
        None => "-".to_owned(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Plain => data.iter().map(plain_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single item; tables use a pre-formatted detail view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Plain => plain_fn(data),
    })
}

/// Print to stdout unless quiet.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
