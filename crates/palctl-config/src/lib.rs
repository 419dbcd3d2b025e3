//! Shared configuration for palctl.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! PuTTY tool discovery, and translation to `palctl_core::ManagerConfig`.
//! The CLI layers its flag overrides on top of this.

mod tools;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use palctl_core::{
    ApiSettings, ConnectionProfile, ControlTimings, ManagerConfig, ServerLayout, SshAuth,
    SshTarget, SyncPaths,
};

pub use tools::{WINDOWS_PUTTY_DIRS, locate_in, locate_tool, resolve_tools};

/// Service name for every secret palctl keeps in the system keyring.
pub const KEYRING_SERVICE: &str = "palctl";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "PALCTL_CONFIG";
pub const API_PASSWORD_ENV: &str = "PALCTL_API_PASSWORD";
pub const SSH_PASSWORD_ENV: &str = "PALCTL_SSH_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured for profile '{profile}'")]
    NoCredentials { profile: String, what: &'static str },

    #[error("keyring error: {message}")]
    Keyring { message: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_ssh_port() -> u16 {
    22
}
fn default_api_username() -> String {
    "admin".into()
}

const DEFAULT_TRANSFER_TIMEOUT: u64 = 120;
const DEFAULT_API_TIMEOUT: u64 = 10;
const SETTINGS_SUBPATH: &str = "Pal/Saved/Config/LinuxServer/PalWorldSettings.ini";

/// One managed server.
///
/// Either `session` (a saved PuTTY session) or `host` must be set.
/// Everything else falls back to the stock SteamCMD layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Saved PuTTY session name. Takes precedence over `host`.
    pub session: Option<String>,

    pub host: Option<String>,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    pub username: Option<String>,

    /// PuTTY private key (`.ppk`).
    pub key_file: Option<PathBuf>,

    /// SSH password (plaintext -- prefer keyring or env var).
    pub ssh_password: Option<String>,

    /// Environment variable holding the SSH password.
    pub ssh_password_env: Option<String>,

    pub plink: Option<PathBuf>,
    pub pscp: Option<PathBuf>,

    pub server_path: Option<String>,
    pub screen_session: Option<String>,
    pub steamcmd_path: Option<String>,
    pub game_port: Option<u16>,
    pub max_players: Option<u32>,

    /// Remote `PalWorldSettings.ini`. Derived from `server_path` when unset.
    pub remote_config: Option<String>,
    pub local_config: Option<PathBuf>,
    pub downloads_dir: Option<PathBuf>,

    /// REST API root, e.g. `http://203.0.113.7:8212`.
    pub api_url: Option<String>,

    #[serde(default = "default_api_username")]
    pub api_username: String,

    /// Admin password (plaintext -- prefer keyring or env var).
    pub api_password: Option<String>,

    /// Environment variable holding the admin password.
    pub api_password_env: Option<String>,

    pub timeout: Option<u64>,
    pub transfer_timeout: Option<u64>,
    pub api_timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            session: None,
            host: None,
            port: default_ssh_port(),
            username: None,
            key_file: None,
            ssh_password: None,
            ssh_password_env: None,
            plink: None,
            pscp: None,
            server_path: None,
            screen_session: None,
            steamcmd_path: None,
            game_port: None,
            max_players: None,
            remote_config: None,
            local_config: None,
            downloads_dir: None,
            api_url: None,
            api_username: default_api_username(),
            api_password: None,
            api_password_env: None,
            timeout: None,
            transfer_timeout: None,
            api_timeout: None,
        }
    }
}

impl Profile {
    /// Whether `session` or `host` is set at all.
    pub fn has_ssh_target(&self) -> bool {
        non_empty(self.session.as_deref()).is_some() || non_empty(self.host.as_deref()).is_some()
    }

    /// Where the SSH tools should connect.
    pub fn ssh_target(&self) -> Result<SshTarget, ConfigError> {
        if let Some(name) = non_empty(self.session.as_deref()) {
            return Ok(SshTarget::Session { name: name.into() });
        }

        let host = non_empty(self.host.as_deref()).ok_or_else(|| ConfigError::Validation {
            field: "host".into(),
            reason: "set either `session` (saved PuTTY session) or `host`".into(),
        })?;
        let username =
            non_empty(self.username.as_deref()).ok_or_else(|| ConfigError::Validation {
                field: "username".into(),
                reason: format!("required when connecting to {host} directly"),
            })?;

        Ok(SshTarget::Direct {
            host: host.into(),
            port: self.port,
            username: username.into(),
        })
    }

    /// Remote settings path, derived from the install dir when not given.
    pub fn remote_config_path(&self) -> String {
        if let Some(path) = non_empty(self.remote_config.as_deref()) {
            return path.into();
        }
        match non_empty(self.server_path.as_deref()) {
            Some(base) => format!("{}/{SETTINGS_SUBPATH}", base.trim_end_matches('/')),
            None => palctl_core::config::DEFAULT_REMOTE_CONFIG.into(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via `PALCTL_CONFIG` or platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    ProjectDirs::from("com", "palctl", "palctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("palctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_at(&config_path())
}

/// Load from an explicit file. `PALCTL_*` variables still apply on top;
/// nested keys use `__` (`PALCTL_DEFAULTS__TIMEOUT=60`).
pub fn load_config_at(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PALCTL_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|err| {
        tracing::debug!(error = %err, "using default config");
        Config::default()
    })
}

/// Write the config file, creating parent directories.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_at(cfg, &config_path())
}

pub fn save_config_at(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(cfg)?;
    std::fs::write(path, content)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

/// Which secret a keyring entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Ssh,
    Api,
}

impl SecretKind {
    fn account(self, profile_name: &str) -> String {
        match self {
            Self::Ssh => format!("{profile_name}/ssh-password"),
            Self::Api => format!("{profile_name}/api-password"),
        }
    }
}

fn keyring_secret(profile_name: &str, kind: SecretKind) -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.account(profile_name)).ok()?;
    entry.get_password().ok()
}

/// Store a secret for `profile_name` in the system keyring.
pub fn store_secret(profile_name: &str, kind: SecretKind, secret: &str) -> Result<(), ConfigError> {
    let keyring_err = |e: keyring::Error| ConfigError::Keyring {
        message: e.to_string(),
    };
    let entry =
        keyring::Entry::new(KEYRING_SERVICE, &kind.account(profile_name)).map_err(keyring_err)?;
    entry.set_password(secret).map_err(keyring_err)
}

fn env_secret(custom: Option<&str>, standard: &str) -> Option<String> {
    custom
        .and_then(|name| std::env::var(name).ok())
        .or_else(|| std::env::var(standard).ok())
        .filter(|v| !v.is_empty())
}

/// SSH auth: key file, then password (env, keyring, plaintext), else
/// whatever the saved session or Pageant supplies.
pub fn resolve_ssh_auth(profile: &Profile, profile_name: &str) -> SshAuth {
    if let Some(ref key) = profile.key_file {
        return SshAuth::KeyFile(key.clone());
    }

    env_secret(profile.ssh_password_env.as_deref(), SSH_PASSWORD_ENV)
        .or_else(|| keyring_secret(profile_name, SecretKind::Ssh))
        .or_else(|| profile.ssh_password.clone())
        .map_or(SshAuth::Default, |pw| SshAuth::Password(SecretString::from(pw)))
}

/// Resolve the REST API admin password from the credential chain.
pub fn resolve_api_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Env var (profile-specific name first)
    if let Some(pw) = env_secret(profile.api_password_env.as_deref(), API_PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. System keyring
    if let Some(pw) = keyring_secret(profile_name, SecretKind::Api) {
        return Ok(SecretString::from(pw));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.api_password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        what: "API password",
    })
}

/// API endpoint settings, or `None` when the profile has no `api_url`.
pub fn resolve_api_settings(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<ApiSettings>, ConfigError> {
    let Some(raw) = non_empty(profile.api_url.as_deref()) else {
        return Ok(None);
    };

    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected http:// or https://, got {raw}"),
        });
    }

    Ok(Some(ApiSettings {
        url,
        username: profile.api_username.clone(),
        password: resolve_api_password(profile, profile_name)?,
        timeout: Duration::from_secs(profile.api_timeout.unwrap_or(DEFAULT_API_TIMEOUT)),
    }))
}

// ── Translation ─────────────────────────────────────────────────────

/// Translate a profile into a `ManagerConfig`.
///
/// `fallback_timeout` applies when the profile sets no command timeout.
/// This is the single boundary where config types cross into core types.
pub fn profile_to_manager_config(
    profile: &Profile,
    profile_name: &str,
    fallback_timeout: Duration,
) -> Result<ManagerConfig, ConfigError> {
    let command_timeout = profile.timeout.map_or(fallback_timeout, Duration::from_secs);
    let transfer_timeout = Duration::from_secs(
        profile
            .transfer_timeout
            .unwrap_or(DEFAULT_TRANSFER_TIMEOUT)
            .max(command_timeout.as_secs()),
    );

    // API-only profiles carry no target; remote commands report it on use.
    let target = if profile.has_ssh_target() {
        Some(profile.ssh_target()?)
    } else {
        None
    };
    let connection = ConnectionProfile {
        target,
        auth: resolve_ssh_auth(profile, profile_name),
        command_timeout,
        transfer_timeout,
    };

    let stock = ServerLayout::default();
    let layout = ServerLayout {
        server_path: profile.server_path.clone().unwrap_or(stock.server_path),
        screen_session: profile.screen_session.clone().unwrap_or(stock.screen_session),
        steamcmd_path: profile.steamcmd_path.clone().unwrap_or(stock.steamcmd_path),
        game_port: profile.game_port.unwrap_or(stock.game_port),
        max_players: profile.max_players.unwrap_or(stock.max_players),
    };

    let stock = SyncPaths::default();
    let downloads_dir = profile.downloads_dir.clone().unwrap_or(stock.downloads_dir);
    let paths = SyncPaths {
        remote_config: profile.remote_config_path(),
        local_config: profile
            .local_config
            .clone()
            .unwrap_or_else(|| downloads_dir.join(palctl_core::remote::CONFIG_FILE_NAME)),
        downloads_dir,
    };

    Ok(ManagerConfig {
        connection,
        tools: resolve_tools(profile),
        layout,
        paths,
        api: resolve_api_settings(profile, profile_name)?,
        timings: ControlTimings::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
default_profile = "vps"

[defaults]
output = "json"

[profiles.vps]
session = "PalworldVPS"
server_path = "/srv/palworld"
api_url = "http://203.0.113.7:8212"
api_password = "hunter2"

[profiles.direct]
host = "203.0.113.7"
port = 2222
username = "steam"
key_file = "C:/keys/steam.ppk"
"#;

    fn sample() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let cfg = load_config_at(&path).unwrap();
        (dir, cfg)
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let (_dir, cfg) = sample();
        assert_eq!(cfg.default_profile.as_deref(), Some("vps"));
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.color, "auto");
        assert_eq!(cfg.profiles.len(), 2);
        assert_eq!(cfg.profiles["vps"].api_username, "admin");
        assert_eq!(cfg.profiles["vps"].port, 22);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_at(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let (dir, mut cfg) = sample();
        cfg.profiles.get_mut("vps").unwrap().max_players = Some(16);
        let path = dir.path().join("nested").join("config.toml");

        save_config_at(&cfg, &path).unwrap();
        let reloaded = load_config_at(&path).unwrap();

        assert_eq!(reloaded.profiles["vps"].max_players, Some(16));
        assert_eq!(reloaded.profiles["direct"].port, 2222);
    }

    #[test]
    fn session_target_wins_over_host() {
        let profile = Profile {
            session: Some("PalworldVPS".into()),
            host: Some("ignored".into()),
            ..Profile::default()
        };
        assert_eq!(
            profile.ssh_target().unwrap(),
            SshTarget::Session {
                name: "PalworldVPS".into()
            }
        );
    }

    #[test]
    fn direct_target_needs_username() {
        let profile = Profile {
            host: Some("203.0.113.7".into()),
            ..Profile::default()
        };
        let err = profile.ssh_target().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "username"));

        let empty = Profile::default();
        assert!(matches!(
            empty.ssh_target().unwrap_err(),
            ConfigError::Validation { ref field, .. } if field == "host"
        ));
    }

    #[test]
    fn remote_config_follows_server_path() {
        let profile = Profile {
            server_path: Some("/srv/palworld/".into()),
            ..Profile::default()
        };
        assert_eq!(
            profile.remote_config_path(),
            "/srv/palworld/Pal/Saved/Config/LinuxServer/PalWorldSettings.ini"
        );
        assert_eq!(
            Profile::default().remote_config_path(),
            palctl_core::config::DEFAULT_REMOTE_CONFIG
        );
    }

    #[test]
    fn translates_profile_to_manager_config() {
        let (_dir, cfg) = sample();
        let profile = &cfg.profiles["vps"];

        let manager =
            profile_to_manager_config(profile, "palctl-test-vps", Duration::from_secs(45)).unwrap();

        assert_eq!(manager.connection.command_timeout, Duration::from_secs(45));
        assert_eq!(manager.connection.transfer_timeout, Duration::from_secs(120));
        assert_eq!(manager.layout.server_path, "/srv/palworld");
        assert_eq!(manager.layout.screen_session, "palworld_server");
        assert!(manager.paths.remote_config.starts_with("/srv/palworld/Pal/Saved"));
        assert_eq!(
            manager.paths.local_config,
            PathBuf::from("downloads").join("PalWorldSettings.ini")
        );
        let api = manager.api.unwrap();
        assert_eq!(api.url.as_str(), "http://203.0.113.7:8212/");
        assert_eq!(api.username, "admin");
    }

    #[test]
    fn api_only_profile_has_no_ssh_target() {
        let profile = Profile {
            api_url: Some("http://203.0.113.7:8212".into()),
            api_password: Some("hunter2".into()),
            ..Profile::default()
        };
        // Only meaningful when the standard variable is not exported.
        if std::env::var(API_PASSWORD_ENV).is_err() {
            let manager =
                profile_to_manager_config(&profile, "palctl-test-api-only", Duration::from_secs(30))
                    .unwrap();
            assert!(manager.connection.target.is_none());
            assert!(manager.api.is_some());
        }

        // A half-configured target is still rejected up front.
        let broken = Profile {
            host: Some("203.0.113.7".into()),
            ..profile
        };
        let err = profile_to_manager_config(&broken, "palctl-test-broken", Duration::from_secs(30))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "username"));
    }

    #[test]
    fn key_file_takes_precedence_for_ssh_auth() {
        let (_dir, cfg) = sample();
        match resolve_ssh_auth(&cfg.profiles["direct"], "palctl-test-direct") {
            SshAuth::KeyFile(path) => assert_eq!(path, PathBuf::from("C:/keys/steam.ppk")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn plaintext_api_password_is_last_resort() {
        let profile = Profile {
            api_password: Some("from-file".into()),
            api_password_env: Some("PALCTL_TEST_UNSET_VARIABLE_1234".into()),
            ..Profile::default()
        };
        // Only meaningful when the standard variable is not exported.
        if std::env::var(API_PASSWORD_ENV).is_err() {
            let pw = resolve_api_password(&profile, "palctl-test-plaintext").unwrap();
            assert_eq!(pw.expose_secret(), "from-file");
        }
    }

    #[test]
    fn rejects_non_http_api_url() {
        let profile = Profile {
            session: Some("s".into()),
            api_url: Some("ftp://203.0.113.7".into()),
            api_password: Some("x".into()),
            ..Profile::default()
        };
        let err = resolve_api_settings(&profile, "palctl-test-ftp").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));
        assert!(
            resolve_api_settings(&Profile::default(), "palctl-test-none")
                .unwrap()
                .is_none()
        );
    }
}
