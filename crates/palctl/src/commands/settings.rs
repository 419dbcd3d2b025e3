//! PalWorldSettings.ini command handlers.

use indexmap::IndexMap;
use serde::Serialize;
use tabled::Tabled;

use palctl_core::settings::field;
use palctl_core::{Command as CoreCommand, CommandResult, Controller, WorldSettings};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output::{self, Palette, Spinner};

use super::util;

// ── Rows ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Setting {
    key: String,
    value: String,
    default: Option<&'static str>,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Option")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Default")]
    default: String,
}

#[derive(Serialize)]
struct Issue {
    key: String,
    value: String,
    expected: String,
}

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Option")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Expected")]
    expected: String,
}

fn collect(settings: &WorldSettings, changed_only: bool) -> Vec<Setting> {
    settings
        .iter()
        .map(|(key, value)| Setting {
            key: key.to_owned(),
            value: value.to_owned(),
            default: field(key).map(|f| f.default),
        })
        .filter(|s| !changed_only || s.default != Some(s.value.as_str()))
        .collect()
}

fn print_settings(settings: &[Setting], global: &GlobalOpts) -> Result<(), CliError> {
    let palette = Palette::new(global.color());
    let out = output::render_list(
        global.output(),
        settings,
        |s| SettingRow {
            key: s.key.clone(),
            value: if s.default.is_some_and(|d| d != s.value) {
                palette.warn(&s.value)
            } else {
                s.value.clone()
            },
            default: s.default.map_or_else(|| palette.dim("(unknown)"), str::to_owned),
        },
        |s| format!("{}={}", s.key, s.value),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Stock defaults; needs no profile or network.
pub fn print_defaults(global: &GlobalOpts) -> Result<(), CliError> {
    print_settings(&collect(&WorldSettings::defaults(), false), global)
}

async fn upload(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let sync = controller.settings_sync();
    let issues = sync.load_local().await?.validate();
    if !issues.is_empty() {
        return Err(CliError::Validation {
            field: "settings".into(),
            reason: format!(
                "{} invalid value(s) in the staged file; run: palctl settings validate",
                issues.len()
            ),
        });
    }

    let prompt = format!(
        "Overwrite {} on the server with {}?",
        sync.paths().remote_config,
        sync.local_path().display()
    );
    if !util::confirm("upload", &prompt, global.yes)? {
        return Ok(());
    }

    let spinner = Spinner::start("Uploading settings", global.quiet);
    controller.execute(CoreCommand::UploadSettings).await?;
    drop(spinner);
    output::note(
        "Settings uploaded. Restart the server to apply them: palctl server restart",
        global.quiet,
    );
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let sync = controller.settings_sync();

    match args.command {
        SettingsCommand::Download => {
            let spinner = Spinner::start("Downloading settings", global.quiet);
            let CommandResult::Path(path) = controller.execute(CoreCommand::DownloadSettings).await?
            else {
                return Err(util::unexpected_result("download-settings"));
            };
            drop(spinner);
            output::note(&format!("Settings saved to {}", path.display()), global.quiet);
            Ok(())
        }

        SettingsCommand::Upload => upload(controller, global).await,

        SettingsCommand::Show { changed } => {
            let settings = sync.load_local().await?;
            print_settings(&collect(&settings, changed), global)
        }

        SettingsCommand::Get { key } => {
            let settings = sync.load_local().await?;
            let value = settings.get(&key).ok_or_else(|| CliError::NotFound {
                resource_type: "setting".into(),
                identifier: key.clone(),
                hint: "Run: palctl settings show".into(),
            })?;
            let setting = Setting {
                default: field(&key).map(|f| f.default),
                value: value.to_owned(),
                key,
            };
            let out = output::render_single(
                global.output(),
                &setting,
                |s| s.value.clone(),
                |s| s.value.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SettingsCommand::Set {
            assignments,
            upload: push,
        } => {
            let mut changes = IndexMap::new();
            for raw in &assignments {
                let (key, value) = util::parse_assignment(raw)?;
                if field(&key).is_none() {
                    tracing::warn!(key = %key, "not a known option; writing it anyway");
                }
                changes.insert(key, value);
            }

            let settings = sync.edit_local(&changes).await?;
            for key in changes.keys() {
                output::note(
                    &format!("{key} = {}", settings.get(key).unwrap_or_default()),
                    global.quiet,
                );
            }

            if push {
                upload(controller, global).await?;
            }
            Ok(())
        }

        SettingsCommand::Validate => {
            let settings = sync.load_local().await?;
            let issues: Vec<Issue> = settings
                .validate()
                .into_iter()
                .map(|i| Issue {
                    expected: i.expected.to_string(),
                    key: i.key,
                    value: i.value,
                })
                .collect();

            if issues.is_empty() {
                let palette = Palette::new(global.color());
                output::note(
                    &palette.good(&format!("{} options, all valid", settings.len())),
                    global.quiet,
                );
                return Ok(());
            }

            let out = output::render_list(
                global.output(),
                &issues,
                |i| IssueRow {
                    key: i.key.clone(),
                    value: i.value.clone(),
                    expected: i.expected.clone(),
                },
                |i| i.key.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Err(CliError::Validation {
                field: "settings".into(),
                reason: format!("{} invalid value(s)", issues.len()),
            })
        }

        SettingsCommand::Locate => {
            let CommandResult::Located(found) =
                controller.execute(CoreCommand::LocateSettings).await?
            else {
                return Err(util::unexpected_result("locate-settings"));
            };
            let path = found.ok_or_else(|| CliError::NotFound {
                resource_type: "settings file".into(),
                identifier: sync.paths().remote_config.clone(),
                hint: "Start the server once so it writes PalWorldSettings.ini, \
                       or write fresh defaults with: palctl settings defaults --write"
                    .into(),
            })?;
            output::print_output(&path, global.quiet);
            Ok(())
        }

        SettingsCommand::Defaults { write: false } => print_defaults(global),

        SettingsCommand::Defaults { write: true } => {
            let path = sync.local_path();
            if path.exists() {
                let prompt = format!("Replace {} with stock defaults?", path.display());
                if !util::confirm("overwrite", &prompt, global.yes)? {
                    return Ok(());
                }
            }
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, WorldSettings::defaults().to_ini()).await?;
            output::note(
                &format!("Stock defaults written to {}", path.display()),
                global.quiet,
            );
            Ok(())
        }
    }
}
