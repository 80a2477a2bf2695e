//! Clap derive structures for the `emsmon` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// emsmon -- live EMS telemetry from the command line
#[derive(Debug, Parser)]
#[command(
    name = "emsmon",
    version,
    about = "Monitor EMS device telemetry from the command line",
    long_about = "Connects to an EMS telemetry WebSocket, requests the device menu,\n\
        subscribes to every point it lists, and prints the device tree or\n\
        live point values grouped by device type.",
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

#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Endpoint profile to use
    #[arg(long, short = 'p', env = "EMSMON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// WebSocket base URL (overrides profile)
    #[arg(long, env = "EMSMON_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Authorization token appended to the endpoint (overrides profile)
    #[arg(long, env = "EMSMON_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format [default: `[defaults] output`, else table]
    #[arg(
        id = "output",
        long = "output",
        short = 'o',
        env = "EMSMON_OUTPUT",
        value_name = "FORMAT",
        global = true
    )]
    pub output_flag: Option<OutputFormat>,

    /// When to use color output [default: `[defaults] color`, else auto]
    #[arg(id = "color", long = "color", value_name = "WHEN", global = true)]
    pub color_flag: Option<ColorMode>,

    /// Effective output format, resolved against the config defaults
    #[arg(skip)]
    pub output: OutputFormat,

    /// Effective color mode, resolved against the config defaults
    #[arg(skip)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Grouped text rows
    Plain,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the device tree (group → device → point)
    #[command(alias = "t")]
    Tree(TreeArgs),

    /// Print current point values once
    #[command(alias = "s")]
    Snapshot(SnapshotArgs),

    /// Continuously re-render point values until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Which part of the topology to show. Defaults to everything.
#[derive(Debug, Clone, Default, Args)]
#[group(multiple = false)]
pub struct SelectionArgs {
    /// Device type group (e.g. "bms" or "d_bms")
    #[arg(long, short = 'g')]
    pub group: Option<String>,

    /// Device, by the id of its first point
    #[arg(long, short = 'd')]
    pub device: Option<i64>,

    /// A single point id
    #[arg(long)]
    pub point: Option<i64>,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Seconds to wait for the device menu
    #[arg(long, default_value = "15")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Seconds to wait for the menu and the first values
    #[arg(long, default_value = "15")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Seconds between redraws
    #[arg(long, short = 'i', default_value = "1")]
    pub interval: u64,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the resolved profile (token redacted)
    Show,

    /// Set a key on the active profile and save the config file
    Set {
        /// Profile key (endpoint, token_env, user_agent, origin,
        /// reconnect_delay_ms, rtv_period, connect_timeout)
        key: String,
        /// New value
        value: String,
    },

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },

    /// Store the active profile's token in the system keyring
    SetToken {
        /// Token value; read from stdin when omitted
        token: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
