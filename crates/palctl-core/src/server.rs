// ── Server control orchestration ──
//
// Start, stop, update, and back up the dedicated server over a
// `RemoteSession`. The server's running state is never cached: every
// check re-derives it from `screen -list`. Each sequence halts at the
// first failing step and leaves recovery to the operator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ControlTimings, ServerLayout};
use crate::error::CoreError;
use crate::remote::{RemoteSession, remote_path_arg, shell_quote};

/// Steam app id of the Palworld dedicated server.
pub const PALWORLD_APP_ID: u32 = 2_394_010;
/// `screen` session SteamCMD updates run in.
pub const UPDATE_SESSION: &str = "steamcmd_update";
pub const UPDATE_LOG: &str = "~/steamcmd_update.log";

const START_TIMEOUT: Duration = Duration::from_secs(60);
const BACKUP_TIMEOUT: Duration = Duration::from_secs(300);

/// Snapshot of the remote server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    pub running: bool,
    /// Matching `screen -list` line.
    pub session: Option<String>,
    /// Matching `ps aux` lines.
    pub process_info: Option<String>,
}

/// How a stop request concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The server honoured the `quit` console command.
    Graceful,
    /// The screen session had to be killed.
    Forced,
}

/// A save-data archive fetched from the VPS.
#[derive(Debug, Clone, Serialize)]
pub struct BackupArtifact {
    pub remote_archive: String,
    pub local_path: PathBuf,
    pub created_at: DateTime<Local>,
    pub size_bytes: u64,
}

/// Orchestrates the server lifecycle through a single remote session.
#[derive(Clone)]
pub struct ServerControl {
    session: RemoteSession,
    layout: ServerLayout,
    timings: ControlTimings,
}

impl ServerControl {
    pub fn new(session: RemoteSession, layout: ServerLayout, timings: ControlTimings) -> Self {
        Self {
            session,
            layout,
            timings,
        }
    }

    pub fn layout(&self) -> &ServerLayout {
        &self.layout
    }

    // ── Status ───────────────────────────────────────────────────

    pub async fn is_running(&self) -> Result<bool, CoreError> {
        Ok(self
            .session_line(&self.layout.screen_session)
            .await?
            .is_some())
    }

    pub async fn status(&self) -> Result<ServerStatus, CoreError> {
        let Some(line) = self.session_line(&self.layout.screen_session).await? else {
            return Ok(ServerStatus {
                running: false,
                session: None,
                process_info: None,
            });
        };

        let ps = self
            .session
            .exec_raw("ps aux | grep PalServer | grep -v grep")
            .await?;
        let process_info = Some(ps.stdout.trim().to_owned()).filter(|s| !s.is_empty());

        Ok(ServerStatus {
            running: true,
            session: Some(line),
            process_info,
        })
    }

    /// First `screen -list` line naming `name`, if any.
    async fn session_line(&self, name: &str) -> Result<Option<String>, CoreError> {
        let out = self
            .session
            .exec_raw(&format!("screen -list | grep {}", shell_quote(name)))
            .await?;
        Ok(out
            .stdout
            .lines()
            .find(|l| l.contains(name))
            .map(|l| l.trim().to_owned()))
    }

    // ── Lifecycle ────────────────────────────────────────────────

    pub(crate) fn start_command(&self) -> String {
        let l = &self.layout;
        format!(
            "screen -dmS {} bash -c 'cd {} && ./PalServer.sh -port={} -players={} \
             -useperfthreads -NoAsyncLoadingThread -UseMultithreadForDS \
             -NumberOfWorkerThreadsServer=3 > server.log 2>&1'",
            shell_quote(&l.screen_session),
            l.server_path,
            l.game_port,
            l.max_players
        )
    }

    /// Launch the server in a detached screen session and confirm it stayed up.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.is_running().await? {
            return Err(CoreError::ServerAlreadyRunning);
        }

        info!(session = %self.layout.screen_session, "starting server");
        self.session
            .run_with_timeout(&self.start_command(), START_TIMEOUT)
            .await?;

        tokio::time::sleep(self.timings.start_settle).await;

        if self.is_running().await? {
            info!("server started");
            Ok(())
        } else {
            Err(CoreError::OperationFailed {
                message: "screen session not found after start; check server.log".into(),
            })
        }
    }

    /// Ask the server to quit, then kill its screen session if it lingers.
    pub async fn stop(&self) -> Result<StopOutcome, CoreError> {
        if !self.is_running().await? {
            return Err(CoreError::ServerNotRunning);
        }

        let session = shell_quote(&self.layout.screen_session);
        info!("sending quit to server console");
        self.session
            .run_remote_command(&format!("screen -S {session} -X stuff $'quit\\n'"))
            .await?;

        tokio::time::sleep(self.timings.stop_grace).await;
        if !self.is_running().await? {
            info!("server stopped");
            return Ok(StopOutcome::Graceful);
        }

        warn!("server still running after quit, closing screen session");
        self.session
            .run_remote_command(&format!("screen -S {session} -X quit"))
            .await?;

        tokio::time::sleep(self.timings.kill_grace).await;
        if self.is_running().await? {
            return Err(CoreError::OperationFailed {
                message: "screen session still running after forced quit".into(),
            });
        }
        info!("server stopped (forced)");
        Ok(StopOutcome::Forced)
    }

    /// Stop (when running), pause, start.
    pub async fn restart(&self) -> Result<(), CoreError> {
        match self.stop().await {
            Ok(_) | Err(CoreError::ServerNotRunning) => {}
            Err(e) => return Err(e),
        }
        tokio::time::sleep(self.timings.restart_pause).await;
        self.start().await
    }

    pub(crate) fn update_command(&self) -> String {
        format!(
            "screen -dmS {UPDATE_SESSION} bash -c \"{} +login anonymous +app_update \
             {PALWORLD_APP_ID} validate +quit | tee {UPDATE_LOG}\"",
            self.layout.steamcmd_path
        )
    }

    /// Stop the server if needed and launch a SteamCMD update in the background.
    ///
    /// Returns once the update session is launched; poll
    /// [`is_update_running`](Self::is_update_running) for completion.
    pub async fn update(&self) -> Result<(), CoreError> {
        if self.is_update_running().await? {
            return Err(CoreError::OperationFailed {
                message: "an update is already running".into(),
            });
        }

        if self.is_running().await? {
            self.stop().await?;
        }
        tokio::time::sleep(self.timings.update_pause).await;

        info!(app_id = PALWORLD_APP_ID, "launching steamcmd update");
        self.session
            .run_remote_command(&self.update_command())
            .await?;
        Ok(())
    }

    pub async fn is_update_running(&self) -> Result<bool, CoreError> {
        Ok(self.session_line(UPDATE_SESSION).await?.is_some())
    }

    /// Last `lines` lines of the SteamCMD update log.
    pub async fn update_log(&self, lines: usize) -> Result<String, CoreError> {
        self.tail(UPDATE_LOG, lines).await
    }

    /// Last `lines` lines of the server's `server.log`.
    pub async fn server_logs(&self, lines: usize) -> Result<String, CoreError> {
        let path = format!("{}/server.log", self.layout.server_path.trim_end_matches('/'));
        self.tail(&path, lines).await
    }

    async fn tail(&self, path: &str, lines: usize) -> Result<String, CoreError> {
        let out = self
            .session
            .run_remote_command(&format!("tail -n {lines} {}", remote_path_arg(path)))
            .await?;
        Ok(out.stdout)
    }

    /// Type a line into the server console.
    pub async fn send_console(&self, command: &str) -> Result<(), CoreError> {
        if !self.is_running().await? {
            return Err(CoreError::ServerNotRunning);
        }
        debug!(command, "console input");
        self.session
            .run_remote_command(&format!(
                "screen -S {} -X stuff $'{}\\n'",
                shell_quote(&self.layout.screen_session),
                ansi_c_escape(command)
            ))
            .await?;
        Ok(())
    }

    // ── Backup ───────────────────────────────────────────────────

    /// Archive `Pal/Saved` on the VPS, download it into `local_dir`, and
    /// remove the remote archive.
    pub async fn backup_and_download(&self, local_dir: &Path) -> Result<BackupArtifact, CoreError> {
        let created_at = Local::now();
        let stamp = created_at.format("%Y%m%d_%H%M%S");
        let remote_archive = format!("/tmp/palworld_saved_backup_{stamp}.tar.gz");
        let local_path = local_dir.join(format!("PalServer_Saved_backup_{stamp}.tar.gz"));

        let server_path = self.session.resolve_path(&self.layout.server_path).await;
        info!(%remote_archive, "creating backup archive");
        self.session
            .run_with_timeout(
                &format!(
                    "tar czf {} -C {} Saved",
                    shell_quote(&remote_archive),
                    remote_path_arg(&format!("{server_path}/Pal"))
                ),
                BACKUP_TIMEOUT,
            )
            .await?;

        let downloaded = self
            .session
            .download_file(&remote_archive, &local_path)
            .await;
        self.remove_remote(&remote_archive).await;
        downloaded?;

        let size_bytes = tokio::fs::metadata(&local_path).await?.len();
        info!(path = %local_path.display(), size_bytes, "backup downloaded");

        Ok(BackupArtifact {
            remote_archive,
            local_path,
            created_at,
            size_bytes,
        })
    }

    async fn remove_remote(&self, path: &str) {
        if let Err(e) = self
            .session
            .run_remote_command(&format!("rm -f {}", shell_quote(path)))
            .await
        {
            warn!(path, error = %e, "failed to remove remote archive");
        }
    }
}

/// Escape text for a bash `$'...'` literal.
fn ansi_c_escape(s: &str) -> String {
    s.replace('\\', r"\\").replace('\'', r"\'")
}
