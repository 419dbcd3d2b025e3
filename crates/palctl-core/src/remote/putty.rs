// PuTTY-backed transport: `plink` for commands, `pscp` for copies.
//
// Both tools always run with `-batch` so a host-key or password prompt
// becomes an error instead of a hang.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::process::Command;
use tracing::debug;

use super::{CommandOutput, RemoteTransport, classify_failure};
use crate::config::{ConnectionProfile, SshAuth, SshTarget, ToolPaths};
use crate::error::CoreError;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Spawns the PuTTY command-line tools once per operation.
#[derive(Debug, Clone)]
pub struct PuttyTransport {
    tools: ToolPaths,
    profile: ConnectionProfile,
}

impl PuttyTransport {
    pub fn new(tools: ToolPaths, profile: ConnectionProfile) -> Self {
        Self { tools, profile }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    // ── Argument builders ────────────────────────────────────────

    pub(crate) fn plink_args(&self, command: &str) -> Result<Vec<String>, CoreError> {
        let target = self.profile.target()?;
        let mut args = vec!["-batch".to_owned()];
        match target {
            SshTarget::Session { name } => args.push(name.clone()),
            SshTarget::Direct { port, .. } => {
                args.push("-ssh".into());
                args.push(target.host_spec());
                args.push("-P".into());
                args.push(port.to_string());
            }
        }
        args.extend(self.auth_args());
        args.push(command.to_owned());
        Ok(args)
    }

    pub(crate) fn pscp_args(&self, source: String, destination: String) -> Vec<String> {
        let mut args = vec!["-batch".to_owned()];
        if let Some(SshTarget::Direct { port, .. }) = &self.profile.target {
            args.push("-P".into());
            args.push(port.to_string());
        }
        args.extend(self.auth_args());
        args.push(source);
        args.push(destination);
        args
    }

    fn auth_args(&self) -> Vec<String> {
        match &self.profile.auth {
            SshAuth::Default => Vec::new(),
            SshAuth::KeyFile(path) => vec!["-i".into(), path.display().to_string()],
            SshAuth::Password(pw) => vec!["-pw".into(), pw.expose_secret().to_owned()],
        }
    }

    /// `host:path` for the remote side of a `pscp` copy.
    fn remote_spec(&self, path: &str) -> Result<String, CoreError> {
        Ok(format!("{}:{path}", self.profile.target()?.host_spec()))
    }

    // ── Process execution ────────────────────────────────────────

    async fn run(
        &self,
        tool: &Path,
        args: Vec<String>,
        timeout: Duration,
        operation: &str,
    ) -> Result<CommandOutput, CoreError> {
        debug!(tool = %tool.display(), args = ?redact(&args), "spawning");

        let mut cmd = Command::new(tool);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let child = cmd.spawn().map_err(|e| spawn_error(tool, e))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CoreError::Timeout {
                    operation: operation.to_owned(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        debug!(exit_code = result.exit_code, "finished");
        Ok(result)
    }

    async fn copy(
        &self,
        source: String,
        destination: String,
        timeout: Duration,
    ) -> Result<(), CoreError> {
        let args = self.pscp_args(source.clone(), destination.clone());
        let output = self
            .run(&self.tools.pscp, args, timeout, "file transfer")
            .await?;

        if output.success() {
            return Ok(());
        }
        if let Some(err) = classify_failure(&self.target(), &output.stderr) {
            return Err(err);
        }
        Err(CoreError::TransferFailed {
            from: source,
            to: destination,
            reason: output.stderr.trim().to_owned(),
        })
    }
}

#[async_trait]
impl RemoteTransport for PuttyTransport {
    fn target(&self) -> String {
        self.profile
            .target
            .as_ref()
            .map_or_else(|| "(no SSH target)".into(), ToString::to_string)
    }

    async fn exec(&self, command: &str, timeout: Duration) -> Result<CommandOutput, CoreError> {
        let args = self.plink_args(command)?;
        let output = self
            .run(&self.tools.plink, args, timeout, "remote command")
            .await?;

        if !output.success() {
            if let Some(err) = classify_failure(&self.target(), &output.stderr) {
                return Err(err);
            }
        }
        Ok(output)
    }

    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        timeout: Duration,
    ) -> Result<(), CoreError> {
        self.copy(
            local.display().to_string(),
            self.remote_spec(remote)?,
            timeout,
        )
        .await
    }

    async fn download(
        &self,
        remote: &str,
        local: &Path,
        timeout: Duration,
    ) -> Result<(), CoreError> {
        self.copy(
            self.remote_spec(remote)?,
            local.display().to_string(),
            timeout,
        )
        .await
    }
}

fn spawn_error(tool: &Path, err: std::io::Error) -> CoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        let name = tool
            .file_stem()
            .map_or_else(|| "tool".into(), |s| s.to_string_lossy().into_owned());
        CoreError::ToolNotFound {
            tool: name,
            path: tool.display().to_string(),
        }
    } else {
        CoreError::Io(err)
    }
}

/// Mask the argument following `-pw`.
fn redact(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            out.push("********".to_owned());
            mask_next = false;
        } else {
            mask_next = arg == "-pw";
            out.push(arg.clone());
        }
    }
    out
}
