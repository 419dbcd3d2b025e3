//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use palctl_config::ConfigError;
use palctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const REMOTE_COMMAND: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach {target}: {reason}")]
    #[diagnostic(
        code(palctl::connection_failed),
        help(
            "Check that the VPS is up and the PuTTY session or host is correct.\n\
             Try: palctl ssh test -v"
        )
    )]
    ConnectionFailed { target: String, reason: String },

    #[error("{tool} not found at '{path}'")]
    #[diagnostic(
        code(palctl::tool_not_found),
        help(
            "Install PuTTY, or point the profile at the tools:\n\
             palctl config set plink 'C:\\Program Files\\PuTTY\\plink.exe'"
        )
    )]
    ToolNotFound { tool: String, path: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed for {target}: {message}")]
    #[diagnostic(
        code(palctl::auth_failed),
        help(
            "Verify the credentials for this profile.\n\
             Run: palctl config set-password {kind}"
        )
    )]
    AuthFailed {
        target: String,
        message: String,
        kind: &'static str,
    },

    #[error("No {what} configured for profile '{profile}'")]
    #[diagnostic(
        code(palctl::no_credentials),
        help(
            "Store one with: palctl config set-password api\n\
             Or set the PALCTL_API_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String, what: String },

    // ── Remote execution ─────────────────────────────────────────────

    #[error("Remote command `{command}` exited with status {exit_code}")]
    #[diagnostic(code(palctl::remote_command), help("{stderr}"))]
    RemoteCommand {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Transfer failed: {from} -> {to}")]
    #[diagnostic(code(palctl::transfer_failed), help("{reason}"))]
    TransferFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("{message}")]
    #[diagnostic(code(palctl::server_state))]
    ServerState { message: String },

    #[error("Another remote operation is in progress; '{operation}' was not started")]
    #[diagnostic(
        code(palctl::busy),
        help("Wait for the running operation to finish and try again.")
    )]
    Busy { operation: String },

    // ── REST API ─────────────────────────────────────────────────────

    #[error("REST API error: {message}")]
    #[diagnostic(code(palctl::api_error))]
    Api { message: String },

    #[error("No REST API endpoint configured")]
    #[diagnostic(
        code(palctl::api_not_configured),
        help(
            "Set one with: palctl config set api_url http://<vps>:8212\n\
             The server also needs RESTAPIEnabled=True in its settings."
        )
    )]
    ApiNotConfigured,

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(palctl::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(palctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(palctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: palctl config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(palctl::no_config),
        help(
            "Create a profile with: palctl config init\n\
             Or pass --host user@host. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("{message}")]
    #[diagnostic(code(palctl::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(palctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("{operation} timed out after {seconds}s")]
    #[diagnostic(
        code(palctl::timeout),
        help("Increase the limit with --timeout or check the VPS load.")
    )]
    Timeout { operation: String, seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ApiNotConfigured => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ToolNotFound { .. } | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Busy { .. } | Self::ServerState { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::RemoteCommand { .. } | Self::TransferFailed { .. } => exit_code::REMOTE_COMMAND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ToolNotFound { tool, path } => CliError::ToolNotFound { tool, path },

            CoreError::SshNotConfigured => CliError::Validation {
                field: "host".into(),
                reason: "this command runs on the VPS; set `session` or `host` \
                         (and `username`) in the profile, or pass --host"
                    .into(),
            },

            CoreError::ConnectionFailed { target, reason } => {
                CliError::ConnectionFailed { target, reason }
            }

            CoreError::AuthenticationFailed { target, message } => CliError::AuthFailed {
                target,
                message,
                kind: "ssh",
            },

            CoreError::ApiAuthentication { message } => CliError::AuthFailed {
                target: "REST API".into(),
                message,
                kind: "api",
            },

            CoreError::ApiUnreachable { url, reason } => CliError::ConnectionFailed {
                target: url,
                reason,
            },

            CoreError::CommandFailed {
                command,
                exit_code,
                stderr,
            } => CliError::RemoteCommand {
                command,
                exit_code,
                stderr,
            },

            CoreError::TransferFailed { from, to, reason } => {
                CliError::TransferFailed { from, to, reason }
            }

            CoreError::Timeout {
                operation,
                timeout_secs,
            } => CliError::Timeout {
                operation,
                seconds: timeout_secs,
            },

            CoreError::RemotePathMissing { path } => CliError::NotFound {
                resource_type: "remote path".into(),
                identifier: path,
                hint: "Check server_path / remote_config in the profile, or run: palctl settings locate".into(),
            },

            CoreError::LocalPath { path, reason } => CliError::NotFound {
                resource_type: "local file".into(),
                identifier: path,
                hint: reason,
            },

            err @ (CoreError::ServerAlreadyRunning
            | CoreError::ServerNotRunning
            | CoreError::OperationFailed { .. }) => CliError::ServerState {
                message: err.to_string(),
            },

            CoreError::ApiStatus { status, message } => CliError::Api {
                message: format!("HTTP {status}: {message}"),
            },

            CoreError::ApiParse { message } => CliError::Api {
                message: format!("unexpected response: {message}"),
            },

            CoreError::ApiNotConfigured => CliError::ApiNotConfigured,

            CoreError::Busy { operation } => CliError::Busy { operation },

            CoreError::Settings { message } => CliError::Config { message },

            CoreError::Validation { message } => CliError::Validation {
                field: "settings".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Io(e) => CliError::Io(e),

            err @ (CoreError::Disconnected | CoreError::Internal(_)) => {
                CliError::Internal(err.to_string())
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile, what } => CliError::NoCredentials {
                profile,
                what: what.into(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_keep_stderr_and_exit_code_9() {
        let err = CliError::from(CoreError::CommandFailed {
            command: "ls /nope".into(),
            exit_code: 2,
            stderr: "ls: cannot access '/nope'".into(),
        });
        assert_eq!(err.exit_code(), exit_code::REMOTE_COMMAND);
        assert!(
            matches!(err, CliError::RemoteCommand { ref stderr, .. } if stderr.contains("/nope"))
        );
    }

    #[test]
    fn api_auth_and_network_failures_get_distinct_codes() {
        let auth = CliError::from(CoreError::ApiAuthentication {
            message: "401".into(),
        });
        let net = CliError::from(CoreError::ApiUnreachable {
            url: "http://203.0.113.7:8212".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);
        assert_eq!(net.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn busy_maps_to_conflict() {
        let err = CliError::from(CoreError::Busy {
            operation: "backup".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
    }
}
