#![allow(clippy::unwrap_used)]
// Settings-file sync and remote session behaviour over the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use palctl_core::{
    CommandOutput, ConfigSync, CoreError, FakeTransport, RemoteSession, SyncPaths,
};

const REMOTE: &str =
    "~/Steam/steamapps/common/PalServer/Pal/Saved/Config/LinuxServer/PalWorldSettings.ini";

const SETTINGS: &str = "; generated by the server\r\n\
[/Script/Pal.PalGameWorldSettings]\r\n\
OptionSettings=(Difficulty=None,ExpRate=1.000000,ServerName=\"Pal Island\",\
CrossplayPlatforms=(Steam,Xbox,PS5,Mac),bHardcore=False)\r\n";

fn session(fake: &Arc<FakeTransport>) -> RemoteSession {
    RemoteSession::with_timeouts(fake.clone(), Duration::from_secs(5), Duration::from_secs(5))
}

fn sync_in(dir: &std::path::Path, fake: &Arc<FakeTransport>) -> ConfigSync {
    ConfigSync::new(
        session(fake),
        SyncPaths {
            remote_config: REMOTE.into(),
            local_config: dir.join("downloads").join("PalWorldSettings.ini"),
            downloads_dir: dir.join("downloads"),
        },
    )
}

// ── Remote session ──────────────────────────────────────────────────

#[tokio::test]
async fn test_exit_code_decides_success() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond("uptime", CommandOutput::ok(" 10:00:00 up 3 days\n"));
    fake.respond(
        "cat /missing",
        CommandOutput {
            stdout: String::new(),
            stderr: "cat: /missing: No such file or directory\n".into(),
            exit_code: 1,
        },
    );
    // warnings on stderr do not turn a zero exit into a failure
    fake.respond(
        "noisy",
        CommandOutput {
            stdout: "done\n".into(),
            stderr: "warning: deprecated flag\n".into(),
            exit_code: 0,
        },
    );
    let s = session(&fake);

    assert!(s.run_remote_command("uptime").await.is_ok());
    assert_eq!(s.run_remote_command("noisy").await.unwrap().stdout, "done\n");

    match s.run_remote_command("cat /missing").await.unwrap_err() {
        CoreError::CommandFailed {
            command,
            exit_code,
            stderr,
        } => {
            assert_eq!(command, "cat /missing");
            assert_eq!(exit_code, 1);
            assert_eq!(stderr, "cat: /missing: No such file or directory\n");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_resolve_path_falls_back_to_literal() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond_seq(
        "readlink -f",
        vec![
            CommandOutput::ok("/home/steam/PalServer\n"),
            CommandOutput::failed(1, ""),
        ],
    );
    let s = session(&fake);

    assert_eq!(s.resolve_path("~/PalServer").await, "/home/steam/PalServer");
    assert_eq!(s.resolve_path("~/gone").await, "~/gone");
}

#[tokio::test]
async fn test_probe_and_existence_checks() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond("echo palctl-connection-ok", CommandOutput::ok("palctl-connection-ok\n"));
    fake.respond("test -f", CommandOutput::ok("NOT_FOUND\n"));
    fake.respond("test -d", CommandOutput::ok("EXISTS\n"));
    let s = session(&fake);

    s.probe().await.unwrap();
    assert!(!s.file_exists("/etc/nothing").await.unwrap());
    assert!(s.dir_exists("~/Steam").await.unwrap());
    assert!(fake.ran("test -d ~/'Steam' && echo EXISTS || echo NOT_FOUND"));
}

#[tokio::test]
async fn test_upload_requires_local_file() {
    let fake = Arc::new(FakeTransport::new());
    let dir = tempfile::tempdir().unwrap();

    let err = session(&fake)
        .upload_file(&dir.path().join("absent.ini"), "/tmp/x.ini")
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::LocalPath { .. }));
    assert!(fake.uploads().is_empty());
}

#[tokio::test]
async fn test_upload_requires_remote_directory() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond("readlink -f", CommandOutput::failed(1, ""));
    fake.respond("test -d", CommandOutput::ok("NOT_FOUND\n"));
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("PalWorldSettings.ini");
    std::fs::write(&local, SETTINGS).unwrap();

    let err = session(&fake)
        .upload_file(&local, "/no/such/dir/PalWorldSettings.ini")
        .await
        .unwrap_err();

    match err {
        CoreError::RemotePathMissing { path } => assert_eq!(path, "/no/such/dir"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(fake.ran("test -d '/no/such/dir'"));
    assert!(fake.uploads().is_empty());
}

#[tokio::test]
async fn test_sync_upload_stops_when_remote_config_dir_is_missing() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond("test -d", CommandOutput::ok("NOT_FOUND\n"));
    let dir = tempfile::tempdir().unwrap();
    let sync = sync_in(dir.path(), &fake);
    std::fs::create_dir_all(dir.path().join("downloads")).unwrap();
    std::fs::write(sync.local_path(), SETTINGS).unwrap();

    let err = sync.upload().await.unwrap_err();

    assert!(matches!(err, CoreError::RemotePathMissing { .. }), "got: {err:?}");
    assert!(fake.uploads().is_empty());
    assert!(fake.file(REMOTE).is_none());
}

// ── Config sync ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_download_creates_staging_dir() {
    let fake = Arc::new(FakeTransport::new());
    fake.put_file(REMOTE, SETTINGS);
    let dir = tempfile::tempdir().unwrap();
    let sync = sync_in(dir.path(), &fake);

    let path = sync.download().await.unwrap();

    assert!(path.starts_with(dir.path().join("downloads")));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SETTINGS);
}

#[tokio::test]
async fn test_upload_then_download_is_byte_identical() {
    let fake = Arc::new(FakeTransport::new());
    let dir = tempfile::tempdir().unwrap();
    let sync = sync_in(dir.path(), &fake);
    std::fs::create_dir_all(dir.path().join("downloads")).unwrap();
    std::fs::write(sync.local_path(), SETTINGS.as_bytes()).unwrap();

    sync.upload().await.unwrap();
    assert_eq!(fake.file(REMOTE).unwrap(), SETTINGS.as_bytes());

    std::fs::remove_file(sync.local_path()).unwrap();
    sync.download().await.unwrap();

    assert_eq!(std::fs::read(sync.local_path()).unwrap(), SETTINGS.as_bytes());
}

#[tokio::test]
async fn test_edit_local_rewrites_only_changed_values() {
    let fake = Arc::new(FakeTransport::new());
    let dir = tempfile::tempdir().unwrap();
    let sync = sync_in(dir.path(), &fake);
    std::fs::create_dir_all(dir.path().join("downloads")).unwrap();
    std::fs::write(sync.local_path(), SETTINGS).unwrap();

    let mut changes = IndexMap::new();
    changes.insert("ServerName".to_string(), "Pal Island 2".to_string());
    changes.insert("ExpRate".to_string(), "1.000000".to_string());

    let settings = sync.edit_local(&changes).await.unwrap();

    assert_eq!(settings.get("ServerName"), Some("Pal Island 2"));
    assert_eq!(
        std::fs::read_to_string(sync.local_path()).unwrap(),
        SETTINGS.replace("\"Pal Island\"", "\"Pal Island 2\"")
    );
}

#[tokio::test]
async fn test_edit_local_rejects_invalid_values() {
    let fake = Arc::new(FakeTransport::new());
    let dir = tempfile::tempdir().unwrap();
    let sync = sync_in(dir.path(), &fake);
    std::fs::create_dir_all(dir.path().join("downloads")).unwrap();
    std::fs::write(sync.local_path(), SETTINGS).unwrap();

    let mut changes = IndexMap::new();
    changes.insert("bHardcore".to_string(), "sometimes".to_string());

    let err = sync.edit_local(&changes).await.unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }), "got: {err:?}");
    assert_eq!(std::fs::read_to_string(sync.local_path()).unwrap(), SETTINGS);
}

#[tokio::test]
async fn test_locate_finds_settings_file() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond_seq(
        "ls -1",
        vec![
            CommandOutput::ok("Engine.ini\nGame.ini\nPalWorldSettings.ini\n"),
            CommandOutput::ok("Engine.ini\n"),
            CommandOutput::failed(2, "ls: cannot access: No such file or directory\n"),
        ],
    );
    let dir = tempfile::tempdir().unwrap();
    let sync = sync_in(dir.path(), &fake);

    assert_eq!(sync.locate().await.unwrap().as_deref(), Some(REMOTE));
    assert_eq!(sync.locate().await.unwrap(), None);
    assert!(matches!(
        sync.locate().await.unwrap_err(),
        CoreError::RemotePathMissing { .. }
    ));
}
