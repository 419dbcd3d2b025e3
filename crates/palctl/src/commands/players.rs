//! Player command handlers (REST API).

use std::time::Duration;

use tabled::Tabled;

use palctl_core::{Controller, Player};

use crate::cli::{GlobalOpts, OutputFormat, PlayersArgs, PlayersCommand};
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util;

#[derive(Tabled)]
struct PlayerRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "User ID")]
    uid: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Ping")]
    ping: String,
    #[tabled(rename = "Location")]
    location: String,
}

fn player_row(p: &Player) -> PlayerRow {
    PlayerRow {
        name: p.name.clone(),
        uid: p.uid().to_owned(),
        level: p.level.map(|l| l.to_string()).unwrap_or_default(),
        ping: p.ping.map(|ms| format!("{ms:.0} ms")).unwrap_or_default(),
        location: p
            .location()
            .map(|(x, y)| format!("{x:.0}, {y:.0}"))
            .unwrap_or_default(),
    }
}

fn print_players(players: &[Player], global: &GlobalOpts) -> Result<(), CliError> {
    if players.is_empty() && global.output() == OutputFormat::Table {
        output::note("No players online", global.quiet);
        return Ok(());
    }
    let out = output::render_list(
        global.output(),
        players,
        player_row,
        |p| p.uid().to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn watch(
    controller: &Controller,
    interval: u64,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let palette = Palette::new(global.color());
    let mut rx = controller
        .watch_players(Duration::from_secs(interval.max(1)))
        .await;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = &mut interrupted => break,
            update = rx.recv() => {
                let Some(update) = update else { break };
                match update {
                    Ok(players) => {
                        let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
                        output::note(
                            &palette.dim(&format!("{stamp}  {} online", players.len())),
                            global.quiet,
                        );
                        print_players(&players, global)?;
                    }
                    // Auth failures will not fix themselves
                    Err(e) if e.is_auth_failure() => return Err(e.into()),
                    Err(e) => {
                        output::note(&palette.bad(&format!("refresh failed: {e}")), global.quiet);
                    }
                }
            }
        }
    }
    Ok(())
}

pub async fn handle(
    controller: &Controller,
    args: PlayersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PlayersCommand::List => {
            let players = controller.players().await?;
            print_players(&players, global)
        }

        PlayersCommand::Watch { interval } => watch(controller, interval, global).await,

        PlayersCommand::Kick { uid, message } => {
            if !util::confirm("kick", &format!("Kick player {uid}?"), global.yes)? {
                return Ok(());
            }
            controller.kick(&uid, message.as_deref()).await?;
            output::note(&format!("Kicked {uid}"), global.quiet);
            Ok(())
        }

        PlayersCommand::Ban { uid, message } => {
            if !util::confirm("ban", &format!("Ban player {uid}?"), global.yes)? {
                return Ok(());
            }
            controller.ban(&uid, message.as_deref()).await?;
            output::note(&format!("Banned {uid}"), global.quiet);
            Ok(())
        }

        PlayersCommand::Unban { uid } => {
            controller.unban(&uid).await?;
            output::note(&format!("Unbanned {uid}"), global.quiet);
            Ok(())
        }

        PlayersCommand::Teleport { uid, x, y, z } => {
            controller.teleport(&uid, x, y, z).await?;
            output::note(&format!("Moved {uid} to ({x}, {y}, {z})"), global.quiet);
            Ok(())
        }
    }
}
