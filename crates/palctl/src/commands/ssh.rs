//! Raw SSH session command handlers.

use palctl_core::{Command as CoreCommand, CommandResult, Controller};

use crate::cli::{GlobalOpts, SshArgs, SshCommand};
use crate::error::CliError;
use crate::output::{self, Palette, Spinner};

use super::util;

pub async fn handle(
    controller: &Controller,
    args: SshArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SshCommand::Test => {
            let target = controller.config().connection.target()?.to_string();
            let spinner = Spinner::start(format!("Connecting to {target}"), global.quiet);
            controller.execute(CoreCommand::Probe).await?;
            drop(spinner);
            let palette = Palette::new(global.color());
            output::note(&palette.good(&format!("Connected to {target}")), global.quiet);
            Ok(())
        }

        SshCommand::Exec { command } => {
            let command = util::join_words(&command);
            let CommandResult::Output(out) =
                controller.execute(CoreCommand::Exec { command }).await?
            else {
                return Err(util::unexpected_result("exec"));
            };
            print!("{}", out.stdout);
            if !out.stderr.is_empty() {
                eprint!("{}", out.stderr);
            }
            Ok(())
        }

        SshCommand::Ls { path } => {
            let path = path.unwrap_or_else(|| controller.config().layout.server_path.clone());
            let CommandResult::Text(listing) =
                controller.execute(CoreCommand::ListDir { path }).await?
            else {
                return Err(util::unexpected_result("list-dir"));
            };
            output::print_output(listing.trim_end(), global.quiet);
            Ok(())
        }
    }
}
