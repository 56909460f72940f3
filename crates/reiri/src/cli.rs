//! Clap derive structures for the `reiri` CLI.
//!
//! Defines the command tree, global flags, and shared value types. Only
//! clap is used here so `build.rs` can include this file for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// reiri -- control Reiri air-conditioning controllers
#[derive(Debug, Parser)]
#[command(
    name = "reiri",
    version,
    about = "Control Reiri HVAC controllers from the command line",
    long_about = "Talks to a Reiri controller over its encrypted WebSocket protocol.\n\n\
        List points, inspect one unit, change power, mode, setpoint, fan and\n\
        flap, or send a raw operate table.",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "REIRI_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller IP address or hostname (overrides profile)
    #[arg(long, short = 'H', env = "REIRI_HOST", global = true)]
    pub host: Option<String>,

    /// Controller WebSocket port (overrides profile)
    #[arg(long, env = "REIRI_PORT", global = true)]
    pub port: Option<u16>,

    /// Login name (overrides profile)
    #[arg(long, short = 'u', env = "REIRI_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "REIRI_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Receive timeout in seconds (overrides profile)
    #[arg(long, env = "REIRI_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect controller points
    #[command(alias = "pt")]
    Points(PointsArgs),

    /// Change power, mode, setpoint, fan or flap of one unit
    Set(SetArgs),

    /// Send a raw operate table
    Op(OpArgs),

    /// Check that the configured credentials are accepted
    Login,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Points ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PointsArgs {
    #[command(subcommand)]
    pub command: PointsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PointsCommand {
    /// List every point the controller reports
    #[command(alias = "ls")]
    List,

    /// Show one point in detail
    Get {
        /// Point id (e.g. p1)
        id: String,
    },

    /// Keep the connection open and re-render on every refresh
    Watch {
        /// Seconds between refreshes
        #[arg(long, short = 'i', default_value = "30")]
        interval: u64,
    },
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("change")
        .required(true)
        .multiple(true)
        .args(["power", "mode", "setpoint", "fan", "flap"])
))]
pub struct SetArgs {
    /// Point id (e.g. p1)
    pub id: String,

    /// Switch the unit on or off
    #[arg(long)]
    pub power: Option<PowerArg>,

    /// Operating mode (also switches the unit on)
    #[arg(long, short = 'm')]
    pub mode: Option<ModeArg>,

    /// Target temperature in °C
    #[arg(long, short = 't', allow_negative_numbers = true)]
    pub setpoint: Option<f64>,

    /// Fan speed step
    #[arg(long, short = 'f')]
    pub fan: Option<FanArg>,

    /// Flap direction: "swing" or a fixed position 0-4
    #[arg(long)]
    pub flap: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PowerArg {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Cool,
    Heat,
    Fan,
    Dry,
    Auto,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FanArg {
    Auto,
    Low,
    MediumLow,
    Medium,
    MediumHigh,
    High,
}

// ── Op ───────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OpArgs {
    /// Operate table as JSON, e.g. '{"p1":{"stat":"off"}}'
    #[arg(required_unless_present = "from_file", conflicts_with = "from_file")]
    pub json: Option<String>,

    /// Read the operate table from a JSON file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (passwords masked)
    Show,

    /// Print the config file location
    Path,

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
