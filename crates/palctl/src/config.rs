//! CLI-side configuration: profile selection and flag overrides layered on
//! top of `palctl_config`.
//!
//! Core never sees these types -- it receives a pre-built `ManagerConfig`.

use std::time::Duration;

use clap::ValueEnum;

use palctl_config::{Config, Profile};
use palctl_core::ManagerConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use palctl_config::{config_path, load_config, load_config_or_default, save_config};

impl GlobalOpts {
    /// Resolved output format (flag > env > config defaults > table).
    pub fn output(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }

    pub fn color(&self) -> ColorMode {
        self.color.unwrap_or(ColorMode::Auto)
    }
}

/// Fill `--output` / `--color` from the config file's `[defaults]` when the
/// flags were not given.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) {
    if global.output.is_none() {
        global.output = OutputFormat::from_str(&cfg.defaults.output, true).ok();
    }
    if global.color.is_none() {
        global.color = ColorMode::from_str(&cfg.defaults.color, true).ok();
    }
}

// ── Profile resolution ──────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Parse `[user@]host[:port]`.
pub fn parse_host_spec(spec: &str) -> Result<(Option<String>, String, Option<u16>), CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: "host".into(),
        reason: format!("{reason} in '{spec}' (expected [user@]host[:port])"),
    };

    let (user, rest) = match spec.split_once('@') {
        Some((user, rest)) if !user.is_empty() => (Some(user.to_owned()), rest),
        Some(_) => return Err(invalid("empty user name")),
        None => (None, spec),
    };

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| invalid("bad port"))?;
            (host, Some(port))
        }
        None => (rest, None),
    };

    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok((user, host.to_owned(), port))
}

/// Apply `--host`, `--api-url`, and `--timeout` on top of a profile.
pub fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref spec) = global.host {
        let (user, host, port) = parse_host_spec(spec)?;
        profile.session = None;
        profile.host = Some(host);
        if let Some(user) = user {
            profile.username = Some(user);
        }
        if let Some(port) = port {
            profile.port = port;
        }
    }
    if let Some(ref url) = global.api_url {
        profile.api_url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok(())
}

/// Build the `ManagerConfig` for the active profile plus CLI overrides.
pub fn build_manager_config(global: &GlobalOpts) -> Result<ManagerConfig, CliError> {
    let cfg = load_config()?;
    let name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&name) {
        Some(profile) => profile.clone(),
        // No profile -- flags alone must describe the server
        None if global.host.is_some() || global.api_url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global)?;
    tracing::debug!(profile = %name, "resolved profile");

    Ok(palctl_config::profile_to_manager_config(
        &profile,
        &name,
        Duration::from_secs(cfg.defaults.timeout),
    )?)
}

/// Look up a profile for editing, with a helpful error when absent.
pub fn require_profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    cfg.profiles
        .get(name)
        .ok_or_else(|| CliError::ProfileNotFound {
            name: name.into(),
            available: available_profiles(cfg),
        })
}
