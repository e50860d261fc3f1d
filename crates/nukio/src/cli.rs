//! Clap derive structures for the `nukio` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nukio -- keep Nuki lock state in sync between the bridge and a host
#[derive(Debug, Parser)]
#[command(
    name = "nukio",
    version,
    about = "Bridge Nuki smart locks to a home-automation host",
    long_about = "Talks to a Nuki Bridge over its local HTTP API, listens for its\n\
        callback notifications, and keeps one consistent lock state per device.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "NUKIO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NUKIO_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the hub: webhook listener, dispatcher and callback registration
    Serve(ServeArgs),

    /// Show the state of one or all configured locks
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Lock a device
    Lock(LockArgs),

    /// Unlock a device (door latches re-lock on their own)
    Unlock(LockArgs),

    /// Manage callback URLs registered on the bridge
    #[command(alias = "cb")]
    Callbacks(CallbacksArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen on this port instead of `webhook.port`
    #[arg(long)]
    pub port: Option<u16>,

    /// Do not register the callback URL with the bridge
    #[arg(long)]
    pub no_register: bool,
}

// ── Locks ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Lock id or name (all locks when omitted)
    pub lock: Option<String>,
}

#[derive(Debug, Args)]
pub struct LockArgs {
    /// Lock id or name (case-insensitive)
    pub lock: String,
}

// ── Callbacks ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CallbacksArgs {
    #[command(subcommand)]
    pub command: CallbacksCommand,
}

#[derive(Debug, Subcommand)]
pub enum CallbacksCommand {
    /// List registered callbacks
    #[command(alias = "ls")]
    List,

    /// Register a callback URL
    Add {
        /// URL the bridge should POST notifications to
        url: String,
    },

    /// Remove a callback by its bridge-assigned id
    #[command(alias = "rm")]
    Remove {
        /// Callback id as shown by `callbacks list`
        id: u32,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path in use
    Path,

    /// Print the effective configuration with secrets redacted
    Show,

    /// Check the configuration without contacting the bridge
    Validate,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
