//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};
use serde::Serialize;
use tabled::Tabled;

use palctl_config::{Config, Profile, SecretKind};
use palctl_core::config::DEFAULT_SERVER_PATH;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretTarget};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Io(std::io::Error::other(format!("prompt failed: {e}")))
}

fn ask(prompt: &str, default: &str) -> Result<String, CliError> {
    Input::new()
        .with_prompt(prompt)
        .default(default.to_owned())
        .interact_text()
        .map_err(prompt_err)
}

fn invalid(field: &str, reason: &str) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Ask for a secret and either store it in the keyring (returns `None`)
/// or hand it back for the config file.
fn capture_secret(
    label: &str,
    profile_name: &str,
    kind: SecretKind,
) -> Result<Option<String>, CliError> {
    let secret = rpassword::prompt_password(format!("{label}: ")).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(invalid(label, "cannot be empty"));
    }

    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {}?", label.to_lowercase()))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        palctl_config::store_secret(profile_name, kind, &secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn parse_opt<T: std::str::FromStr>(
    key: &str,
    value: &str,
    what: &str,
) -> Result<Option<T>, CliError> {
    optional(value)
        .map(|v| v.parse().map_err(|_| invalid(key, &format!("must be {what}"))))
        .transpose()
}

/// Apply one `config set` assignment. An empty value clears optional keys.
fn set_key(profile: &mut Profile, key: &str, value: &str) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "session" => profile.session = optional(value),
        "host" => profile.host = optional(value),
        "port" => {
            profile.port = value
                .trim()
                .parse()
                .map_err(|_| invalid("port", "must be a port number"))?;
        }
        "username" => profile.username = optional(value),
        "key_file" => profile.key_file = optional(value).map(Into::into),
        "ssh_password" => profile.ssh_password = optional(value),
        "ssh_password_env" => profile.ssh_password_env = optional(value),
        "plink" => profile.plink = optional(value).map(Into::into),
        "pscp" => profile.pscp = optional(value).map(Into::into),
        "server_path" => profile.server_path = optional(value),
        "screen_session" => profile.screen_session = optional(value),
        "steamcmd_path" => profile.steamcmd_path = optional(value),
        "game_port" => profile.game_port = parse_opt(key, value, "a port number")?,
        "max_players" => profile.max_players = parse_opt(key, value, "a number")?,
        "remote_config" => profile.remote_config = optional(value),
        "local_config" => profile.local_config = optional(value).map(Into::into),
        "downloads_dir" => profile.downloads_dir = optional(value).map(Into::into),
        "api_url" => profile.api_url = optional(value),
        "api_username" => {
            profile.api_username = optional(value).ok_or_else(|| invalid(key, "cannot be empty"))?;
        }
        "api_password" => profile.api_password = optional(value),
        "api_password_env" => profile.api_password_env = optional(value),
        "timeout" => profile.timeout = parse_opt(key, value, "a number (seconds)")?,
        "transfer_timeout" => {
            profile.transfer_timeout = parse_opt(key, value, "a number (seconds)")?;
        }
        "api_timeout" => profile.api_timeout = parse_opt(key, value, "a number (seconds)")?,
        other => {
            return Err(invalid(
                other,
                "unknown config key. Valid keys: session, host, port, username, key_file, \
                 ssh_password, ssh_password_env, plink, pscp, server_path, screen_session, \
                 steamcmd_path, game_port, max_players, remote_config, local_config, \
                 downloads_dir, api_url, api_username, api_password, api_password_env, \
                 timeout, transfer_timeout, api_timeout",
            ));
        }
    }
    Ok(())
}

/// Copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.ssh_password.is_some() {
            profile.ssh_password = Some(REDACTED.into());
        }
        if profile.api_password.is_some() {
            profile.api_password = Some(REDACTED.into());
        }
    }
    cfg
}

#[derive(Serialize)]
struct ProfileSummary {
    name: String,
    default: bool,
    target: String,
    api_url: Option<String>,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "REST API")]
    api: String,
}

fn summarize(cfg: &Config) -> Vec<ProfileSummary> {
    let default = cfg.default_profile.as_deref().unwrap_or("default");
    cfg.profiles
        .iter()
        .map(|(name, profile)| ProfileSummary {
            name: name.clone(),
            default: name == default,
            target: if profile.has_ssh_target() {
                profile
                    .ssh_target()
                    .map_or_else(|e| format!("(incomplete: {e})"), |t| t.to_string())
            } else {
                "-".into()
            },
            api_url: profile.api_url.clone(),
        })
        .collect()
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init_wizard() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("palctl configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = config::load_config()?;

    // 1. Profile name
    let profile_name = ask("Profile name", "default")?;
    let mut profile = Profile::default();

    // 2. SSH target
    let target_choices = &["Saved PuTTY session", "Host and user name"];
    let target = Select::new()
        .with_prompt("How should palctl reach the VPS?")
        .items(target_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if target == 0 {
        profile.session = Some(ask("PuTTY session name", "PalworldVPS")?);
    } else {
        profile.host = Some(ask("Host", "203.0.113.7")?);
        profile.username = Some(ask("SSH user", "steam")?);
        profile.port = ask("SSH port", "22")?
            .parse()
            .map_err(|_| invalid("port", "must be a port number"))?;

        let auth_choices = &["PuTTY key file (.ppk)", "Password", "Pageant / none"];
        match Select::new()
            .with_prompt("SSH authentication")
            .items(auth_choices)
            .default(0)
            .interact()
            .map_err(prompt_err)?
        {
            0 => profile.key_file = optional(&ask("Key file", "")?).map(Into::into),
            1 => {
                profile.ssh_password =
                    capture_secret("SSH password", &profile_name, SecretKind::Ssh)?;
            }
            _ => {}
        }
    }

    // 3. Server layout
    let server_path = ask("PalServer install path on the VPS", DEFAULT_SERVER_PATH)?;
    if server_path != DEFAULT_SERVER_PATH {
        profile.server_path = Some(server_path);
    }

    // 4. REST API
    let wants_api = Confirm::new()
        .with_prompt("Configure the REST API (players, announcements, shutdown)?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;
    if wants_api {
        let host = profile.host.clone().unwrap_or_else(|| "203.0.113.7".into());
        profile.api_url = Some(ask("REST API URL", &format!("http://{host}:8212"))?);
        profile.api_password =
            capture_secret("Admin password", &profile_name, SecretKind::Api)?;
    }

    // 5. Write config
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: palctl ssh test");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init_wizard(),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(
                global.output(),
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_key(profile, &key, &value)?;

            config::save_config(&cfg)?;
            output::note(&format!("✓ Set {key} on profile '{profile_name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            if cfg.profiles.is_empty() {
                output::note("No profiles configured. Run: palctl config init", global.quiet);
                return Ok(());
            }
            let profiles = summarize(&cfg);
            let out = output::render_list(
                global.output(),
                &profiles,
                |p| ProfileRow {
                    marker: if p.default { "*" } else { "" },
                    name: p.name.clone(),
                    target: p.target.clone(),
                    api: p.api_url.clone().unwrap_or_else(|| "-".into()),
                },
                |p| p.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            config::require_profile(&cfg, &name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::note(&format!("✓ Default profile set to '{name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { kind } => {
            let cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            config::require_profile(&cfg, &profile_name)?;

            let (label, kind) = match kind {
                SecretTarget::Api => ("Admin password: ", SecretKind::Api),
                SecretTarget::Ssh => ("SSH password: ", SecretKind::Ssh),
            };
            let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(invalid("password", "value cannot be empty"));
            }

            palctl_config::store_secret(&profile_name, kind, &secret)?;
            output::note(
                &format!("✓ Password stored in system keyring for profile '{profile_name}'"),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
