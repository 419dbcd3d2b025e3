// ── Core error types ──
//
// Operator-facing errors from palctl-core. Subprocess and HTTP details are
// folded into a small taxonomy: connection, authentication, remote command,
// transfer, API, and local problems. The `From<palctl_api::Error>` impl
// keeps API auth, network, and parse failures distinct.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── SSH / tooling ────────────────────────────────────────────────
    #[error("{tool} not found at '{path}'")]
    ToolNotFound { tool: String, path: String },

    #[error("No SSH target configured")]
    SshNotConfigured,

    #[error("Cannot connect to {target}: {reason}")]
    ConnectionFailed { target: String, reason: String },

    #[error("SSH authentication failed for {target}: {message}")]
    AuthenticationFailed { target: String, message: String },

    #[error("Remote command exited with status {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Transfer {from} -> {to} failed: {reason}")]
    TransferFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("Remote path not found: {path}")]
    RemotePathMissing { path: String },

    #[error("Local path {path}: {reason}")]
    LocalPath { path: String, reason: String },

    // ── Server lifecycle ─────────────────────────────────────────────
    #[error("Server is already running")]
    ServerAlreadyRunning,

    #[error("Server is not running")]
    ServerNotRunning,

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── REST API ─────────────────────────────────────────────────────
    #[error("API authentication failed: {message}")]
    ApiAuthentication { message: String },

    #[error("API unreachable at {url}: {reason}")]
    ApiUnreachable { url: String, reason: String },

    #[error("API returned HTTP {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("API response could not be parsed: {message}")]
    ApiParse { message: String },

    #[error("No REST API endpoint configured")]
    ApiNotConfigured,

    // ── Worker ───────────────────────────────────────────────────────
    #[error("Another remote operation is in progress; '{operation}' was not started")]
    Busy { operation: String },

    #[error("Controller is not connected")]
    Disconnected,

    // ── Local data ───────────────────────────────────────────────────
    #[error("Settings file error: {message}")]
    Settings { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for SSH or API credential rejections.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::ApiAuthentication { .. }
        )
    }

    /// `true` when the remote end was never reached.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::ApiUnreachable { .. } | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<palctl_api::Error> for CoreError {
    fn from(err: palctl_api::Error) -> Self {
        match err {
            palctl_api::Error::Authentication { message } => {
                CoreError::ApiAuthentication { message }
            }
            palctl_api::Error::Status {
                endpoint,
                status,
                body,
            } => CoreError::ApiStatus {
                status,
                message: if body.is_empty() {
                    format!("{endpoint} request rejected")
                } else {
                    format!("{endpoint}: {body}")
                },
            },
            palctl_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout {
                        operation: "API request".into(),
                        timeout_secs: 0,
                    }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ApiUnreachable {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::ApiStatus {
                        status: e.status().map_or(0, |s| s.as_u16()),
                        message: e.to_string(),
                    }
                }
            }
            palctl_api::Error::Timeout { timeout_secs } => CoreError::Timeout {
                operation: "API request".into(),
                timeout_secs,
            },
            palctl_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid API URL: {e}"),
            },
            palctl_api::Error::ClientBuild(msg) => CoreError::Internal(msg),
            palctl_api::Error::Deserialization { message, body: _ } => {
                CoreError::ApiParse { message }
            }
        }
    }
}
