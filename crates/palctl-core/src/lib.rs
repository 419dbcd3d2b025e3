// palctl-core: remote session, server orchestration, and settings sync
// between the CLI and the VPS.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod remote;
pub mod server;
pub mod settings;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{
    ApiSettings, ConnectionProfile, ControlTimings, ManagerConfig, ServerLayout, SshAuth,
    SshTarget, SyncPaths, ToolPaths,
};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use remote::{CommandOutput, FakeTransport, PuttyTransport, RemoteSession, RemoteTransport};
pub use server::{BackupArtifact, ServerControl, ServerStatus, StopOutcome};
pub use settings::{FieldKind, FieldSpec, ValidationIssue, WorldSettings};
pub use sync::ConfigSync;

// API types surfaced through the controller.
pub use palctl_api::{Player, Reachability, ServerInfo};
