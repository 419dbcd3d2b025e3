// ── Remote session client ──
//
// Every interaction with the VPS goes through a `RemoteTransport`: one
// shell command or one file copy per call. `RemoteSession` layers path
// resolution, local staging checks, and exit-code handling on top.

pub mod fake;
pub mod putty;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ConnectionProfile;
use crate::error::CoreError;

pub use fake::FakeTransport;
pub use putty::PuttyTransport;

/// Directory the dedicated server writes its settings file to.
pub const CONFIG_DIR: &str = "~/Steam/steamapps/common/PalServer/Pal/Saved/Config/LinuxServer";
pub const CONFIG_FILE_NAME: &str = "PalWorldSettings.ini";

const PROBE_MARKER: &str = "palctl-connection-ok";

// ── CommandOutput ────────────────────────────────────────────────

/// Captured result of one remote shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Exit 0 with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Non-zero exit with the given stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ── Transport seam ───────────────────────────────────────────────

/// One SSH command or one file copy against the VPS.
///
/// `exec` returns `Ok` for any exit code the remote shell produced; it
/// only errors when the command never ran (tool missing, connection or
/// authentication failure, timeout).
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Human-readable description of the remote end.
    fn target(&self) -> String;

    async fn exec(&self, command: &str, timeout: Duration) -> Result<CommandOutput, CoreError>;

    async fn upload(&self, local: &Path, remote: &str, timeout: Duration)
    -> Result<(), CoreError>;

    async fn download(
        &self,
        remote: &str,
        local: &Path,
        timeout: Duration,
    ) -> Result<(), CoreError>;
}

// ── RemoteSession ────────────────────────────────────────────────

/// Cheaply cloneable handle issuing commands and transfers to the VPS.
#[derive(Clone)]
pub struct RemoteSession {
    transport: Arc<dyn RemoteTransport>,
    command_timeout: Duration,
    transfer_timeout: Duration,
}

impl RemoteSession {
    pub fn new(transport: Arc<dyn RemoteTransport>, profile: &ConnectionProfile) -> Self {
        Self::with_timeouts(transport, profile.command_timeout, profile.transfer_timeout)
    }

    pub fn with_timeouts(
        transport: Arc<dyn RemoteTransport>,
        command_timeout: Duration,
        transfer_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            command_timeout,
            transfer_timeout,
        }
    }

    pub fn target(&self) -> String {
        self.transport.target()
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Run a command; a non-zero exit is a [`CoreError::CommandFailed`]
    /// carrying the remote stderr verbatim.
    pub async fn run_remote_command(&self, command: &str) -> Result<CommandOutput, CoreError> {
        self.run_with_timeout(command, self.command_timeout).await
    }

    /// [`run_remote_command`](Self::run_remote_command) with an explicit limit.
    pub async fn run_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, CoreError> {
        let output = self.transport.exec(command, timeout).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(CoreError::CommandFailed {
                command: command.to_owned(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }

    /// Run a command and return its output whatever the exit status.
    pub async fn exec_raw(&self, command: &str) -> Result<CommandOutput, CoreError> {
        self.transport.exec(command, self.command_timeout).await
    }

    /// Round-trip an `echo` to prove the session works end to end.
    pub async fn probe(&self) -> Result<(), CoreError> {
        let output = self
            .run_remote_command(&format!("echo {PROBE_MARKER}"))
            .await?;
        if output.stdout.contains(PROBE_MARKER) {
            Ok(())
        } else {
            Err(CoreError::ConnectionFailed {
                target: self.target(),
                reason: format!("unexpected probe output: {}", output.stdout.trim()),
            })
        }
    }

    // ── Remote filesystem queries ────────────────────────────────

    /// Expand `~` and symlinks with `readlink -f`, falling back to the
    /// literal path when the remote side cannot resolve it.
    pub async fn resolve_path(&self, path: &str) -> String {
        match self
            .exec_raw(&format!("readlink -f {}", remote_path_arg(path)))
            .await
        {
            Ok(out) if out.success() && !out.stdout.trim().is_empty() => {
                out.stdout.trim().to_owned()
            }
            Ok(_) | Err(_) => {
                debug!(path, "path not resolvable, using literal");
                path.to_owned()
            }
        }
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool, CoreError> {
        self.test_path("-f", path).await
    }

    pub async fn dir_exists(&self, path: &str) -> Result<bool, CoreError> {
        self.test_path("-d", path).await
    }

    async fn test_path(&self, flag: &str, path: &str) -> Result<bool, CoreError> {
        let out = self
            .exec_raw(&format!(
                "test {flag} {} && echo EXISTS || echo NOT_FOUND",
                remote_path_arg(path)
            ))
            .await?;
        Ok(out.stdout.contains("EXISTS"))
    }

    /// `ls -la` of a remote directory.
    pub async fn list_dir(&self, path: &str) -> Result<String, CoreError> {
        let out = self
            .run_remote_command(&format!("ls -la {}", remote_path_arg(path)))
            .await?;
        Ok(out.stdout)
    }

    /// Look for the settings file in `dir`. `Ok(None)` when the directory
    /// exists but holds no settings file.
    pub async fn find_config_file(&self, dir: &str) -> Result<Option<String>, CoreError> {
        let out = self
            .exec_raw(&format!("ls -1 {}", remote_path_arg(dir)))
            .await?;

        if !out.success() {
            return Err(CoreError::RemotePathMissing {
                path: dir.to_owned(),
            });
        }

        let found = out.stdout.lines().any(|l| l.trim() == CONFIG_FILE_NAME);
        Ok(found.then(|| format!("{}/{CONFIG_FILE_NAME}", dir.trim_end_matches('/'))))
    }

    // ── Transfers ────────────────────────────────────────────────

    /// Copy a local file to the VPS. The local file and the remote
    /// directory must both exist.
    pub async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), CoreError> {
        let meta = tokio::fs::metadata(local)
            .await
            .map_err(|e| CoreError::LocalPath {
                path: local.display().to_string(),
                reason: e.to_string(),
            })?;
        if !meta.is_file() {
            return Err(CoreError::LocalPath {
                path: local.display().to_string(),
                reason: "not a regular file".into(),
            });
        }

        let remote = self.resolve_path(remote).await;
        if let Some((dir, _)) = remote.rsplit_once('/').filter(|(dir, _)| !dir.is_empty()) {
            if !self.dir_exists(dir).await? {
                return Err(CoreError::RemotePathMissing {
                    path: dir.to_owned(),
                });
            }
        }
        debug!(local = %local.display(), %remote, "upload");
        self.transport
            .upload(local, &remote, self.transfer_timeout)
            .await
    }

    /// Copy a remote file down, creating the local parent directory first.
    pub async fn download_file(&self, remote: &str, local: &Path) -> Result<(), CoreError> {
        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::LocalPath {
                    path: parent.display().to_string(),
                    reason: e.to_string(),
                })?;
        }

        let remote = self.resolve_path(remote).await;
        debug!(%remote, local = %local.display(), "download");
        self.transport
            .download(&remote, local, self.transfer_timeout)
            .await?;

        if tokio::fs::try_exists(local).await.unwrap_or(false) {
            Ok(())
        } else {
            Err(CoreError::TransferFailed {
                from: remote,
                to: local.display().to_string(),
                reason: "local file missing after transfer".into(),
            })
        }
    }
}

// ── Shell helpers ────────────────────────────────────────────────

/// Single-quote a string for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Quote a remote path but leave a leading `~/` bare so the shell expands it.
pub fn remote_path_arg(path: &str) -> String {
    if path == "~" {
        "~".into()
    } else if let Some(rest) = path.strip_prefix("~/") {
        if rest.is_empty() {
            "~/".into()
        } else {
            format!("~/{}", shell_quote(rest))
        }
    } else {
        shell_quote(path)
    }
}

// ── Failure classification ───────────────────────────────────────

const AUTH_PATTERNS: &[&str] = &[
    "Access denied",
    "No supported authentication methods",
    "Server refused our key",
    "Authentication failed",
    "Unable to use key file",
];

const NETWORK_PATTERNS: &[&str] = &[
    "Network error",
    "Host does not exist",
    "Connection refused",
    "Connection timed out",
    "Connection abandoned",
    "host key is not cached",
    "Remote side unexpectedly closed",
];

/// Map PuTTY diagnostics to connection-level errors.
///
/// Returns `None` when the output looks like an ordinary remote failure.
pub(crate) fn classify_failure(target: &str, stderr: &str) -> Option<CoreError> {
    let message = stderr.trim();
    if AUTH_PATTERNS.iter().any(|p| message.contains(p)) {
        return Some(CoreError::AuthenticationFailed {
            target: target.to_owned(),
            message: message.to_owned(),
        });
    }
    if NETWORK_PATTERNS.iter().any(|p| message.contains(p)) {
        return Some(CoreError::ConnectionFailed {
            target: target.to_owned(),
            reason: message.to_owned(),
        });
    }
    None
}
