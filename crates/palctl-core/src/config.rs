// ── Runtime connection configuration ──
//
// These types describe *how* to reach the VPS and the game API.
// They carry credential data and timing, but never touch disk.
// The CLI constructs a `ManagerConfig` and hands it to the `Controller`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_SERVER_PATH: &str = "~/Steam/steamapps/common/PalServer";
pub const DEFAULT_REMOTE_CONFIG: &str =
    "~/Steam/steamapps/common/PalServer/Pal/Saved/Config/LinuxServer/PalWorldSettings.ini";
pub const DEFAULT_SCREEN_SESSION: &str = "palworld_server";
pub const DEFAULT_GAME_PORT: u16 = 8211;

/// Where the SSH tools should connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshTarget {
    /// A saved PuTTY session (host, user, and key live in the PuTTY registry).
    Session { name: String },
    /// An explicit `user@host:port`.
    Direct {
        host: String,
        port: u16,
        username: String,
    },
}

impl SshTarget {
    /// The host part handed to `plink` / prefixed to `pscp` remote paths.
    pub fn host_spec(&self) -> String {
        match self {
            Self::Session { name } => name.clone(),
            Self::Direct { host, username, .. } => format!("{username}@{host}"),
        }
    }
}

impl std::fmt::Display for SshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session { name } => write!(f, "session '{name}'"),
            Self::Direct {
                host,
                port,
                username,
            } => write!(f, "{username}@{host}:{port}"),
        }
    }
}

/// How the SSH tools authenticate.
#[derive(Debug, Clone, Default)]
pub enum SshAuth {
    /// Whatever the saved session or Pageant provides.
    #[default]
    Default,
    /// A PuTTY private key file (`-i`).
    KeyFile(PathBuf),
    /// A password (`-pw`).
    Password(SecretString),
}

/// Everything needed to parameterise a remote call. Immutable per session.
///
/// `target` is `None` for API-only setups; remote calls then fail with
/// [`CoreError::SshNotConfigured`] while API and local work still run.
#[derive(Debug, Clone)]
pub struct ConnectionProfile {
    pub target: Option<SshTarget>,
    pub auth: SshAuth,
    /// Per-command limit for `plink`.
    pub command_timeout: Duration,
    /// Per-transfer limit for `pscp`.
    pub transfer_timeout: Duration,
}

impl ConnectionProfile {
    pub fn new(target: SshTarget, auth: SshAuth) -> Self {
        Self {
            target: Some(target),
            auth,
            command_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(30),
        }
    }

    pub fn target(&self) -> Result<&SshTarget, CoreError> {
        self.target.as_ref().ok_or(CoreError::SshNotConfigured)
    }
}

/// Local paths of the PuTTY command-line tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub plink: PathBuf,
    pub pscp: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            plink: PathBuf::from("plink"),
            pscp: PathBuf::from("pscp"),
        }
    }
}

/// Remote layout of the dedicated server install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLayout {
    /// PalServer install directory (may start with `~`).
    pub server_path: String,
    /// `screen` session the server runs in.
    pub screen_session: String,
    /// SteamCMD executable on the VPS.
    pub steamcmd_path: String,
    pub game_port: u16,
    pub max_players: u32,
}

impl Default for ServerLayout {
    fn default() -> Self {
        Self {
            server_path: DEFAULT_SERVER_PATH.into(),
            screen_session: DEFAULT_SCREEN_SESSION.into(),
            steamcmd_path: "steamcmd".into(),
            game_port: DEFAULT_GAME_PORT,
            max_players: 32,
        }
    }
}

/// Remote settings file and its local staging copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPaths {
    pub remote_config: String,
    pub local_config: PathBuf,
    /// Where backups and the staged config land.
    pub downloads_dir: PathBuf,
}

impl Default for SyncPaths {
    fn default() -> Self {
        Self {
            remote_config: DEFAULT_REMOTE_CONFIG.into(),
            local_config: PathBuf::from("downloads/PalWorldSettings.ini"),
            downloads_dir: PathBuf::from("downloads"),
        }
    }
}

/// REST API endpoint and credentials.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// API root, e.g. `http://203.0.113.7:8212`.
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub timeout: Duration,
}

/// Delays inside the start/stop/update sequences.
///
/// The server takes a while to register or release its `screen` session;
/// these are the waits between issuing a command and checking its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlTimings {
    pub start_settle: Duration,
    pub stop_grace: Duration,
    pub kill_grace: Duration,
    pub restart_pause: Duration,
    pub update_pause: Duration,
}

impl Default for ControlTimings {
    fn default() -> Self {
        Self {
            start_settle: Duration::from_secs(5),
            stop_grace: Duration::from_secs(10),
            kill_grace: Duration::from_secs(5),
            restart_pause: Duration::from_secs(5),
            update_pause: Duration::from_secs(10),
        }
    }
}

impl ControlTimings {
    /// No waits at all. Used with in-memory transports.
    pub fn immediate() -> Self {
        Self {
            start_settle: Duration::ZERO,
            stop_grace: Duration::ZERO,
            kill_grace: Duration::ZERO,
            restart_pause: Duration::ZERO,
            update_pause: Duration::ZERO,
        }
    }
}

/// Complete configuration for one managed server.
///
/// Built by the CLI, passed to `Controller` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub connection: ConnectionProfile,
    pub tools: ToolPaths,
    pub layout: ServerLayout,
    pub paths: SyncPaths,
    /// `None` when no API endpoint is configured; API calls then fail fast.
    pub api: Option<ApiSettings>,
    pub timings: ControlTimings,
}

impl ManagerConfig {
    /// Config with defaults everywhere except the SSH target.
    pub fn for_target(target: SshTarget) -> Self {
        Self {
            connection: ConnectionProfile::new(target, SshAuth::Default),
            tools: ToolPaths::default(),
            layout: ServerLayout::default(),
            paths: SyncPaths::default(),
            api: None,
            timings: ControlTimings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_spec_for_direct_and_session() {
        let direct = SshTarget::Direct {
            host: "203.0.113.7".into(),
            port: 2222,
            username: "steam".into(),
        };
        assert_eq!(direct.host_spec(), "steam@203.0.113.7");
        assert_eq!(direct.to_string(), "steam@203.0.113.7:2222");

        let session = SshTarget::Session {
            name: "PalworldVPS".into(),
        };
        assert_eq!(session.host_spec(), "PalworldVPS");
    }

    #[test]
    fn defaults_point_at_steam_install() {
        let cfg = ManagerConfig::for_target(SshTarget::Session { name: "s".into() });
        assert!(cfg.paths.remote_config.starts_with(&cfg.layout.server_path));
        assert_eq!(cfg.layout.game_port, 8211);
        assert!(cfg.api.is_none());
    }

    #[test]
    fn missing_target_is_reported_on_use() {
        let mut profile = ConnectionProfile::new(
            SshTarget::Session { name: "s".into() },
            SshAuth::Default,
        );
        assert!(profile.target().is_ok());

        profile.target = None;
        assert!(matches!(profile.target(), Err(CoreError::SshNotConfigured)));
    }
}
