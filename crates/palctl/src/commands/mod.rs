//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod api;
pub mod config_cmd;
pub mod players;
pub mod server;
pub mod settings;
pub mod ssh;
pub mod util;

use palctl_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Server(args) => server::handle(controller, args, global).await,
        Command::Settings(args) => settings::handle(controller, args, global).await,
        Command::Players(args) => players::handle(controller, args, global).await,
        Command::Api(args) => api::handle(controller, args, global).await,
        Command::Ssh(args) => ssh::handle(controller, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not run against a server".into(),
        )),
    }
}
