// ── Command API ──
//
// Every operation that touches the SSH session is a `Command`. The
// controller funnels them through one worker task, so at most one runs
// against the VPS at a time.

use std::path::PathBuf;

use strum::IntoStaticStr;

use crate::error::CoreError;
use crate::remote::CommandOutput;
use crate::server::{BackupArtifact, ServerStatus, StopOutcome};

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All remote operations the controller can run.
#[derive(Debug, Clone, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    // ── Session ──────────────────────────────────────────────────────
    Probe,
    Exec { command: String },
    ListDir { path: String },

    // ── Server lifecycle ─────────────────────────────────────────────
    ServerStatus,
    StartServer,
    StopServer,
    RestartServer,
    UpdateServer,
    UpdateStatus,
    UpdateLog { lines: usize },
    ServerLogs { lines: usize },
    SendConsole { command: String },
    Backup { local_dir: PathBuf },

    // ── Settings file ────────────────────────────────────────────────
    DownloadSettings,
    UploadSettings,
    LocateSettings,
}

impl Command {
    /// Short kebab-case name used in logs and busy errors.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Result of a successfully executed command.
#[derive(Debug)]
pub enum CommandResult {
    Ok,
    Status(ServerStatus),
    Stopped(StopOutcome),
    Flag(bool),
    Text(String),
    Output(CommandOutput),
    Backup(BackupArtifact),
    Path(PathBuf),
    Located(Option<String>),
}
