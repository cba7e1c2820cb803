//! Clap derive structures for the `gsm` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gsm -- remote console and player roster for game servers
#[derive(Debug, Parser)]
#[command(
    name = "gsm",
    version,
    about = "Talk to game servers over RCON and track who is playing",
    long_about = "Sends console commands to a running game server over RCON and\n\
        keeps a player roster that merges the live player list with the\n\
        profiles the server has saved to disk.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "GSM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server address (overrides profile)
    #[arg(long, short = 'a', env = "GSM_ADDRESS", global = true)]
    pub address: Option<String>,

    /// RCON port (overrides profile)
    #[arg(long, short = 'P', env = "GSM_PORT", global = true)]
    pub port: Option<u16>,

    /// RCON password (overrides profile and keyring)
    #[arg(long, env = "GSM_RCON_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GSM_OUTPUT",
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

    /// Connect and command timeout in seconds (overrides profile)
    #[arg(long, env = "GSM_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

impl GlobalOpts {
    /// Whether any flag pins the connection parameters.
    pub fn overrides_connection(&self) -> bool {
        self.address.is_some() || self.port.is_some() || self.password.is_some()
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Run one console command and print the reply
    #[command(alias = "x")]
    Exec(ExecArgs),

    /// Show the merged player roster
    #[command(alias = "pl")]
    Players(PlayersArgs),

    /// Interactive console: each input line is sent as a command
    Console(ConsoleArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Command and arguments, joined with spaces
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PlayersArgs {
    /// Keep polling and reprint the roster on every change
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Only show players currently online
    #[arg(long)]
    pub online: bool,

    /// Override the profile's save directory
    #[arg(long)]
    pub save_dir: Option<std::path::PathBuf>,

    /// Override the poll interval (e.g. "10s", "1m")
    #[arg(long)]
    pub interval: Option<humantime::Duration>,
}

#[derive(Debug, Args)]
pub struct ConsoleArgs {
    /// Don't follow connection changes in the config file
    #[arg(long)]
    pub no_follow: bool,
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
    /// Print the effective configuration (passwords redacted)
    Show,
    /// List configured profiles
    Profiles,
}
