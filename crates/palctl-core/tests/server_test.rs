#![allow(clippy::unwrap_used)]
// Server lifecycle orchestration against the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use palctl_core::{
    CommandOutput, ControlTimings, CoreError, FakeTransport, RemoteSession, ServerControl,
    ServerLayout, StopOutcome,
};

// ── Helpers ─────────────────────────────────────────────────────────

const RUNNING: &str = "\t12345.palworld_server\t(10/17/2026 09:12:44 PM)\t(Detached)\n";

fn setup() -> (Arc<FakeTransport>, ServerControl) {
    let fake = Arc::new(FakeTransport::new());
    let session = RemoteSession::with_timeouts(
        fake.clone(),
        Duration::from_secs(5),
        Duration::from_secs(5),
    );
    let control = ServerControl::new(session, ServerLayout::default(), ControlTimings::immediate());
    (fake, control)
}

fn running() -> CommandOutput {
    CommandOutput::ok(RUNNING)
}

fn not_running() -> CommandOutput {
    CommandOutput::failed(1, "")
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_reports_session_and_process() {
    let (fake, control) = setup();
    fake.respond("screen -list", running());
    fake.respond(
        "ps aux",
        CommandOutput::ok("steam 4242 98.0 PalServer-Linux-Shipping\n"),
    );

    let status = control.status().await.unwrap();

    assert!(status.running);
    assert_eq!(
        status.session.as_deref(),
        Some("12345.palworld_server\t(10/17/2026 09:12:44 PM)\t(Detached)")
    );
    assert_eq!(
        status.process_info.as_deref(),
        Some("steam 4242 98.0 PalServer-Linux-Shipping")
    );
}

#[tokio::test]
async fn test_status_when_stopped_skips_process_lookup() {
    let (fake, control) = setup();
    fake.respond("screen -list", not_running());

    let status = control.status().await.unwrap();

    assert!(!status.running);
    assert!(status.session.is_none());
    assert!(!fake.ran("ps aux"));
}

// ── Start ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_refuses_when_running() {
    let (fake, control) = setup();
    fake.respond("screen -list", running());

    let err = control.start().await.unwrap_err();

    assert!(matches!(err, CoreError::ServerAlreadyRunning));
    assert!(!fake.ran("screen -dmS"));
}

#[tokio::test]
async fn test_start_verifies_session_appeared() {
    let (fake, control) = setup();
    fake.respond_seq("screen -list", vec![not_running(), running()]);

    control.start().await.unwrap();

    assert!(fake.ran("./PalServer.sh -port=8211 -players=32"));
}

#[tokio::test]
async fn test_start_fails_when_session_never_appears() {
    let (fake, control) = setup();
    fake.respond("screen -list", not_running());

    let err = control.start().await.unwrap_err();

    assert!(matches!(err, CoreError::OperationFailed { .. }), "got: {err:?}");
}

// ── Stop / restart ──────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_graceful() {
    let (fake, control) = setup();
    fake.respond_seq("screen -list", vec![running(), not_running()]);

    let outcome = control.stop().await.unwrap();

    assert_eq!(outcome, StopOutcome::Graceful);
    assert!(fake.ran("-X stuff $'quit\\n'"));
    assert!(!fake.ran("-X quit"));
}

#[tokio::test]
async fn test_stop_forces_lingering_session() {
    let (fake, control) = setup();
    fake.respond_seq("screen -list", vec![running(), running(), not_running()]);

    let outcome = control.stop().await.unwrap();

    assert_eq!(outcome, StopOutcome::Forced);
    assert!(fake.ran("screen -S 'palworld_server' -X quit"));
}

#[tokio::test]
async fn test_stop_fails_when_session_survives_kill() {
    let (fake, control) = setup();
    fake.respond("screen -list", running());

    let err = control.stop().await.unwrap_err();

    assert!(matches!(err, CoreError::OperationFailed { .. }));
}

#[tokio::test]
async fn test_stop_refuses_when_not_running() {
    let (fake, control) = setup();
    fake.respond("screen -list", not_running());

    let err = control.stop().await.unwrap_err();

    assert!(matches!(err, CoreError::ServerNotRunning));
    assert!(!fake.ran("-X stuff"));
}

#[tokio::test]
async fn test_restart_tolerates_stopped_server() {
    let (fake, control) = setup();
    // stop check, start check, start verification
    fake.respond_seq(
        "screen -list",
        vec![not_running(), not_running(), running()],
    );

    control.restart().await.unwrap();

    assert!(fake.ran("screen -dmS"));
}

// ── Update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_stops_server_then_launches_steamcmd() {
    let (fake, control) = setup();
    fake.respond("grep 'steamcmd_update'", not_running());
    // update's running check, stop's check, post-quit check
    fake.respond_seq("screen -list", vec![running(), running(), not_running()]);

    control.update().await.unwrap();

    let commands = fake.commands();
    let quit = commands.iter().position(|c| c.contains("quit\\n")).unwrap();
    let launch = commands
        .iter()
        .position(|c| c.contains("+app_update 2394010 validate"))
        .unwrap();
    assert!(quit < launch);
}

#[tokio::test]
async fn test_update_aborts_when_stop_fails() {
    let (fake, control) = setup();
    fake.respond("grep 'steamcmd_update'", not_running());
    fake.respond("screen -list", running());
    fake.respond("-X stuff", CommandOutput::failed(1, "No screen session found.\n"));

    let err = control.update().await.unwrap_err();

    match err {
        CoreError::CommandFailed { stderr, .. } => {
            assert_eq!(stderr, "No screen session found.\n");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(!fake.ran("app_update"));
}

#[tokio::test]
async fn test_update_refuses_while_update_running() {
    let (fake, control) = setup();
    fake.respond(
        "grep 'steamcmd_update'",
        CommandOutput::ok("\t777.steamcmd_update\t(Detached)\n"),
    );

    assert!(control.is_update_running().await.unwrap());
    let err = control.update().await.unwrap_err();
    assert!(matches!(err, CoreError::OperationFailed { .. }));
}

// ── Logs and console ────────────────────────────────────────────────

#[tokio::test]
async fn test_logs_tail_expected_files() {
    let (fake, control) = setup();
    fake.respond(
        "steamcmd_update.log",
        CommandOutput::ok("Success! App '2394010' fully installed.\n"),
    );
    fake.respond(
        "server.log",
        CommandOutput::ok("Setting breakpad minidump AppID = 2394010\n"),
    );

    let update_log = control.update_log(50).await.unwrap();
    let server_log = control.server_logs(20).await.unwrap();

    assert!(update_log.contains("fully installed"));
    assert!(server_log.contains("breakpad"));
    assert!(fake.ran("tail -n 20 ~/'Steam/steamapps/common/PalServer/server.log'"));
}

#[tokio::test]
async fn test_send_console_requires_running_server() {
    let (fake, control) = setup();
    fake.respond_seq("screen -list", vec![not_running(), running()]);

    let err = control.send_console("Save").await.unwrap_err();
    assert!(matches!(err, CoreError::ServerNotRunning));

    control.send_console("Broadcast it's_time").await.unwrap();
    assert!(fake.ran("-X stuff $'Broadcast it\\'s_time\\n'"));
}

// ── Backup ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_backup_downloads_and_cleans_up() {
    let (fake, control) = setup();
    fake.respond(
        "readlink -f ~/",
        CommandOutput::ok("/home/steam/Steam/steamapps/common/PalServer\n"),
    );
    fake.serve_missing_as(b"archive".to_vec());
    let dir = tempfile::tempdir().unwrap();

    let artifact = control.backup_and_download(dir.path()).await.unwrap();

    assert!(fake.ran(
        "-C '/home/steam/Steam/steamapps/common/PalServer/Pal' Saved"
    ));
    assert_eq!(fake.downloads(), vec![artifact.remote_archive.clone()]);
    assert!(artifact.remote_archive.starts_with("/tmp/palworld_saved_backup_"));
    let name = artifact.local_path.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("PalServer_Saved_backup_"));
    assert!(name.ends_with(".tar.gz"));
    assert_eq!(artifact.size_bytes, 7);
    assert!(fake.ran(&format!("rm -f '{}'", artifact.remote_archive)));
}

#[tokio::test]
async fn test_failed_archive_step_never_downloads() {
    let (fake, control) = setup();
    fake.respond(
        "tar czf",
        CommandOutput::failed(2, "tar: Saved: Cannot stat: No such file or directory\n"),
    );
    let dir = tempfile::tempdir().unwrap();

    let err = control.backup_and_download(dir.path()).await.unwrap_err();

    assert!(matches!(err, CoreError::CommandFailed { exit_code: 2, .. }));
    assert!(fake.downloads().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_download_still_removes_remote_archive() {
    let (fake, control) = setup();
    fake.fail_downloads("Connection abandoned");
    let dir = tempfile::tempdir().unwrap();

    let err = control.backup_and_download(dir.path()).await.unwrap_err();

    assert!(matches!(err, CoreError::TransferFailed { .. }));
    assert!(fake.ran("rm -f '/tmp/palworld_saved_backup_"));
}
