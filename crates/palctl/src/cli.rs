//! Clap derive structures for the `palctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// palctl -- manage a Palworld dedicated server on a remote VPS
#[derive(Debug, Parser)]
#[command(
    name = "palctl",
    version,
    about = "Manage a Palworld dedicated server on a remote VPS",
    long_about = "Start, stop, update, and back up a Palworld dedicated server over SSH\n\
        (PuTTY plink/pscp), edit its PalWorldSettings.ini, and drive the\n\
        game's REST API for players, announcements, and shutdowns.",
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
    #[arg(long, short = 'p', env = "PALCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// SSH target as [user@]host[:port] (overrides the profile's session/host)
    #[arg(long, short = 'H', env = "PALCTL_HOST", global = true)]
    pub host: Option<String>,

    /// REST API root, e.g. http://203.0.113.7:8212 (overrides profile)
    #[arg(long, env = "PALCTL_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format [default: table]
    #[arg(long, short = 'o', env = "PALCTL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: auto]
    #[arg(long, env = "PALCTL_COLOR", global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Remote command timeout in seconds
    #[arg(long, env = "PALCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Control the dedicated server process
    #[command(alias = "srv", alias = "s")]
    Server(ServerArgs),

    /// Download, edit, and upload PalWorldSettings.ini
    #[command(alias = "ini")]
    Settings(SettingsArgs),

    /// List and moderate connected players (REST API)
    #[command(alias = "pl")]
    Players(PlayersArgs),

    /// Server-wide REST API actions
    Api(ApiArgs),

    /// Raw access to the SSH session
    Ssh(SshArgs),

    /// Manage configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Server ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Show whether the server's screen session is alive
    #[command(alias = "st")]
    Status,

    /// Launch the server in a detached screen session
    Start,

    /// Stop the server (graceful quit, then forced)
    Stop,

    /// Stop then start the server
    Restart,

    /// Stop the server and launch a SteamCMD update in the background
    Update,

    /// Check whether a SteamCMD update is still running
    UpdateStatus,

    /// Show the tail of the SteamCMD update log
    UpdateLog {
        /// Number of lines
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,
    },

    /// Show the tail of the server log
    Logs {
        /// Number of lines
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,
    },

    /// Type a line into the server console
    Send {
        /// Console command, e.g. `Save`
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Archive Pal/Saved on the VPS and download it
    Backup {
        /// Local directory for the archive (defaults to the profile's downloads dir)
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,
    },
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Fetch the remote settings file into the local staging copy
    #[command(alias = "pull")]
    Download,

    /// Push the local staging copy to the VPS
    #[command(alias = "push")]
    Upload,

    /// Show the options in the local staging copy
    Show {
        /// Only options that differ from the stock defaults
        #[arg(long)]
        changed: bool,
    },

    /// Print a single option value
    Get {
        /// Option key, e.g. `ServerName`
        key: String,
    },

    /// Change options in the local staging copy
    Set {
        /// KEY=VALUE pairs
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,

        /// Upload the file after editing
        #[arg(long)]
        upload: bool,
    },

    /// Check option values against their expected types
    Validate,

    /// Find the settings file in the server's config directory
    Locate,

    /// Show the stock option defaults
    Defaults {
        /// Write a fresh settings file with the defaults to the staging path
        #[arg(long)]
        write: bool,
    },
}

// ── Players ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlayersArgs {
    #[command(subcommand)]
    pub command: PlayersCommand,
}

#[derive(Debug, Subcommand)]
pub enum PlayersCommand {
    /// List online players
    #[command(alias = "ls")]
    List,

    /// Refresh the player list until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(long, short = 'i', default_value = "10")]
        interval: u64,
    },

    /// Kick a player
    Kick {
        /// Player user id, e.g. `steam_76561198000000000`
        uid: String,
        /// Message shown to the player
        #[arg(long, short = 'm')]
        message: Option<String>,
    },

    /// Ban a player
    Ban {
        /// Player user id
        uid: String,
        /// Message shown to the player
        #[arg(long, short = 'm')]
        message: Option<String>,
    },

    /// Lift a ban
    Unban {
        /// Player user id
        uid: String,
    },

    /// Move a player to world coordinates
    Teleport {
        /// Player user id
        uid: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(allow_negative_numbers = true)]
        z: f64,
    },
}

// ── API ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ApiArgs {
    #[command(subcommand)]
    pub command: ApiCommand,
}

#[derive(Debug, Subcommand)]
pub enum ApiCommand {
    /// Server name, version, and world id
    Info,

    /// Broadcast a message to every player
    Announce {
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Save the world
    Save,

    /// Save the world, then shut the server down after a countdown
    Shutdown {
        /// Seconds before the server exits
        #[arg(long, short = 'w', default_value = "30")]
        wait: u32,

        /// Message broadcast with the countdown
        #[arg(long, short = 'm', default_value = "Server is shutting down")]
        message: String,

        /// Skip the save before shutting down
        #[arg(long)]
        no_save: bool,
    },

    /// Check whether the API answers and enforces credentials
    Probe,
}

// ── SSH ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SshArgs {
    #[command(subcommand)]
    pub command: SshCommand,
}

#[derive(Debug, Subcommand)]
pub enum SshCommand {
    /// Verify the SSH connection
    Test,

    /// Run a shell command on the VPS
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List a remote directory
    Ls {
        /// Directory (defaults to the server install dir)
        path: Option<String>,
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
    /// Interactive setup wizard
    Init,

    /// Show the current configuration
    Show,

    /// Set a profile key
    Set {
        /// Key, e.g. `host`, `api_url`, `max_players`
        key: String,
        value: String,
    },

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },

    /// List configured profiles
    Profiles,

    /// Store a password in the system keyring
    SetPassword {
        /// Which password to store
        #[arg(value_enum, default_value = "api")]
        kind: SecretTarget,
    },

    /// Print the config file location
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretTarget {
    /// REST API admin password
    Api,
    /// SSH login password
    Ssh,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
