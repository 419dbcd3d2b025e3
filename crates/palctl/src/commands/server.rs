//! Server lifecycle command handlers.

use serde::Serialize;

use palctl_core::{
    BackupArtifact, Command as CoreCommand, CommandResult, Controller, ServerStatus, StopOutcome,
};

use crate::cli::{GlobalOpts, ServerArgs, ServerCommand};
use crate::error::CliError;
use crate::output::{self, Palette, Spinner};

use super::util;

#[derive(Serialize)]
struct UpdateState {
    updating: bool,
}

#[derive(Serialize)]
struct LogTail<'a> {
    lines: Vec<&'a str>,
}

fn status_detail(status: &ServerStatus, palette: Palette) -> String {
    let state = if status.running {
        palette.good("running")
    } else {
        palette.bad("stopped")
    };
    let mut lines = vec![format!("State:    {state}")];
    if let Some(ref session) = status.session {
        lines.push(format!("Session:  {session}"));
    }
    if let Some(ref process) = status.process_info {
        for (i, line) in process.lines().enumerate() {
            let label = if i == 0 { "Process: " } else { "         " };
            lines.push(format!("{label} {}", palette.dim(line)));
        }
    }
    lines.join("\n")
}

fn backup_detail(artifact: &BackupArtifact) -> String {
    [
        format!("Archive:  {}", artifact.local_path.display()),
        format!("Size:     {} bytes", artifact.size_bytes),
        format!("Created:  {}", artifact.created_at.format("%Y-%m-%d %H:%M:%S")),
        format!("Remote:   {} (removed)", artifact.remote_archive),
    ]
    .join("\n")
}

fn print_log(text: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let tail = LogTail {
        lines: text.lines().collect(),
    };
    let out = output::render_single(
        global.output(),
        &tail,
        |_| text.trim_end().to_owned(),
        |_| text.trim_end().to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(
    controller: &Controller,
    args: ServerArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let palette = Palette::new(global.color());

    match args.command {
        ServerCommand::Status => {
            let CommandResult::Status(status) = controller.execute(CoreCommand::ServerStatus).await?
            else {
                return Err(util::unexpected_result("server-status"));
            };
            let out = output::render_single(
                global.output(),
                &status,
                |s| status_detail(s, palette),
                |s| String::from(if s.running { "running" } else { "stopped" }),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::Start => {
            let spinner = Spinner::start("Starting server", global.quiet);
            controller.execute(CoreCommand::StartServer).await?;
            drop(spinner);
            output::note(&palette.good("Server started"), global.quiet);
            Ok(())
        }

        ServerCommand::Stop => {
            if !util::confirm("stop", "Stop the Palworld server?", global.yes)? {
                return Ok(());
            }
            let spinner = Spinner::start("Stopping server", global.quiet);
            let CommandResult::Stopped(outcome) = controller.execute(CoreCommand::StopServer).await?
            else {
                return Err(util::unexpected_result("stop-server"));
            };
            drop(spinner);
            let message = match outcome {
                StopOutcome::Graceful => palette.good("Server stopped"),
                StopOutcome::Forced => palette.warn("Server stopped (screen session killed)"),
            };
            output::note(&message, global.quiet);
            Ok(())
        }

        ServerCommand::Restart => {
            if !util::confirm("restart", "Restart the Palworld server?", global.yes)? {
                return Ok(());
            }
            let spinner = Spinner::start("Restarting server", global.quiet);
            controller.execute(CoreCommand::RestartServer).await?;
            drop(spinner);
            output::note(&palette.good("Server restarted"), global.quiet);
            Ok(())
        }

        ServerCommand::Update => {
            if !util::confirm(
                "update",
                "Stop the server and run a SteamCMD update?",
                global.yes,
            )? {
                return Ok(());
            }
            let spinner = Spinner::start("Launching SteamCMD update", global.quiet);
            controller.execute(CoreCommand::UpdateServer).await?;
            drop(spinner);
            output::note(
                "Update running in the background. Follow it with: palctl server update-log",
                global.quiet,
            );
            Ok(())
        }

        ServerCommand::UpdateStatus => {
            let CommandResult::Flag(updating) = controller.execute(CoreCommand::UpdateStatus).await?
            else {
                return Err(util::unexpected_result("update-status"));
            };
            let out = output::render_single(
                global.output(),
                &UpdateState { updating },
                |s| {
                    if s.updating {
                        palette.warn("Update in progress")
                    } else {
                        palette.good("No update running")
                    }
                },
                |s| s.updating.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::UpdateLog { lines } => {
            let CommandResult::Text(text) =
                controller.execute(CoreCommand::UpdateLog { lines }).await?
            else {
                return Err(util::unexpected_result("update-log"));
            };
            print_log(&text, global)
        }

        ServerCommand::Logs { lines } => {
            let CommandResult::Text(text) =
                controller.execute(CoreCommand::ServerLogs { lines }).await?
            else {
                return Err(util::unexpected_result("server-logs"));
            };
            print_log(&text, global)
        }

        ServerCommand::Send { command } => {
            let command = util::join_words(&command);
            controller
                .execute(CoreCommand::SendConsole {
                    command: command.clone(),
                })
                .await?;
            output::note(&format!("Sent: {command}"), global.quiet);
            Ok(())
        }

        ServerCommand::Backup { dir } => {
            let local_dir = dir.unwrap_or_else(|| controller.config().paths.downloads_dir.clone());
            let spinner = Spinner::start("Archiving and downloading save data", global.quiet);
            let CommandResult::Backup(artifact) = controller
                .execute(CoreCommand::Backup { local_dir })
                .await?
            else {
                return Err(util::unexpected_result("backup"));
            };
            drop(spinner);
            let out = output::render_single(global.output(), &artifact, backup_detail, |a| {
                a.local_path.display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
