//! Server-wide REST API command handlers.

use serde::Serialize;

use palctl_core::{Controller, Reachability, ServerInfo};

use crate::cli::{ApiArgs, ApiCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Palette, Spinner};

use super::util;

#[derive(Serialize)]
struct ProbeReport {
    url: String,
    auth_required: bool,
    status: Option<u16>,
}

impl ProbeReport {
    fn new(url: String, reach: Reachability) -> Self {
        match reach {
            Reachability::AuthRequired => Self {
                url,
                auth_required: true,
                status: Some(401),
            },
            Reachability::Open => Self {
                url,
                auth_required: false,
                status: None,
            },
            Reachability::Unexpected(status) => Self {
                url,
                auth_required: false,
                status: Some(status),
            },
        }
    }
}

fn info_detail(info: &ServerInfo) -> String {
    let mut lines = vec![
        format!("Name:        {}", info.server_name),
        format!("Version:     {}", info.version),
        format!("World:       {}", info.world_guid),
    ];
    if !info.description.is_empty() {
        lines.push(format!("Description: {}", info.description));
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: ApiArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let palette = Palette::new(global.color());

    match args.command {
        ApiCommand::Info => {
            let info = controller.server_info().await?;
            let out = output::render_single(global.output(), &info, info_detail, |i| {
                i.version.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ApiCommand::Announce { message } => {
            let message = util::join_words(&message);
            controller.announce(&message).await?;
            output::note("Announcement sent", global.quiet);
            Ok(())
        }

        ApiCommand::Save => {
            let spinner = Spinner::start("Saving world", global.quiet);
            controller.save_world().await?;
            drop(spinner);
            output::note(&palette.good("World saved"), global.quiet);
            Ok(())
        }

        ApiCommand::Shutdown {
            wait,
            message,
            no_save,
        } => {
            let prompt = format!("Shut the server down in {wait}s?");
            if !util::confirm("shutdown", &prompt, global.yes)? {
                return Ok(());
            }
            if no_save {
                controller.shutdown(wait, &message).await?;
            } else {
                controller.shutdown_save(wait, &message).await?;
            }
            output::note(
                &palette.warn(&format!("Shutdown scheduled in {wait}s")),
                global.quiet,
            );
            Ok(())
        }

        ApiCommand::Probe => {
            let url = controller
                .config()
                .api
                .as_ref()
                .map(|api| api.url.to_string())
                .unwrap_or_default();
            let report = ProbeReport::new(url, controller.probe_api().await?);
            let out = output::render_single(
                global.output(),
                &report,
                |r| match (r.auth_required, r.status) {
                    (true, _) => palette.good(&format!("{}: up, credentials enforced", r.url)),
                    (false, None) => {
                        palette.warn(&format!("{}: up, no credentials required", r.url))
                    }
                    (false, Some(status)) => {
                        palette.bad(&format!("{}: answered HTTP {status}", r.url))
                    }
                },
                |r| r.auth_required.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
