// ── Controller abstraction ──
//
// Single entry point for the CLI. Remote operations are queued to one
// command-processor task; REST API calls go straight to the client since
// they never touch the SSH session.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use palctl_api::{PalworldClient, Player, Reachability, ServerInfo, TransportConfig};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::remote::{PuttyTransport, RemoteSession, RemoteTransport};
use crate::server::ServerControl;
use crate::sync::ConfigSync;

const COMMAND_CHANNEL_SIZE: usize = 64;
const WATCH_CHANNEL_SIZE: usize = 4;

// ── ConnectionState ──────────────────────────────────────────────

/// Whether the command worker is accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

// ── Controller ───────────────────────────────────────────────────

/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ManagerConfig,
    session: RemoteSession,
    server: ServerControl,
    sync: ConfigSync,
    api: Option<PalworldClient>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    /// Commands submitted but not yet answered.
    pending: AtomicUsize,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller that talks to the VPS through `plink`/`pscp`.
    /// Does NOT start the worker -- call [`connect()`](Self::connect).
    pub fn new(config: ManagerConfig) -> Result<Self, CoreError> {
        let transport = PuttyTransport::new(config.tools.clone(), config.connection.clone());
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a controller over an arbitrary transport.
    pub fn with_transport(
        config: ManagerConfig,
        transport: Arc<dyn RemoteTransport>,
    ) -> Result<Self, CoreError> {
        let session = RemoteSession::new(transport, &config.connection);
        let server = ServerControl::new(session.clone(), config.layout.clone(), config.timings);
        let sync = ConfigSync::new(session.clone(), config.paths.clone());

        let api = config
            .api
            .as_ref()
            .map(|api| {
                PalworldClient::new(
                    api.url.clone(),
                    api.username.clone(),
                    api.password.clone(),
                    &TransportConfig::with_timeout(api.timeout),
                )
            })
            .transpose()?;

        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                session,
                server,
                sync,
                api,
                connection_state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                pending: AtomicUsize::new(0),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Settings-file access for local-only operations (parse, edit).
    pub fn settings_sync(&self) -> &ConfigSync {
        &self.inner.sync
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Spawn the command-processor task.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let Some(rx) = self.inner.command_rx.lock().await.take() else {
            return Err(CoreError::Internal(
                "controller cannot be reconnected after disconnect".into(),
            ));
        };

        let ctrl = self.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(command_processor_task(ctrl, rx)));

        let _ = self.inner.connection_state.send(ConnectionState::Connected);
        debug!(target = %self.inner.session.target(), "command worker started");
        Ok(())
    }

    /// Stop the worker and any player watches, and wait for them to exit.
    ///
    /// A command already running on the VPS is allowed to finish first.
    pub async fn disconnect(&self) {
        let _ = self
            .inner
            .connection_state
            .send(ConnectionState::Disconnected);
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("disconnected");
    }

    /// One-shot: connect, run closure, disconnect.
    pub async fn oneshot<F, Fut, T>(config: ManagerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config)?;
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    // ── Command execution ────────────────────────────────────────

    /// Queue a command behind any in-flight work and await its result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let _pending = PendingGuard(&self.inner.pending);
        self.submit(cmd).await
    }

    /// Run a command only if nothing else is queued or running.
    pub async fn try_execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self
            .inner
            .pending
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CoreError::Busy {
                operation: cmd.name().to_owned(),
            });
        }
        let _pending = PendingGuard(&self.inner.pending);
        self.submit(cmd).await
    }

    /// Whether a command is queued or running.
    pub fn is_busy(&self) -> bool {
        self.inner.pending.load(Ordering::SeqCst) > 0
    }

    async fn submit(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.connection_state.borrow() != ConnectionState::Connected {
            return Err(CoreError::Disconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Disconnected)?;

        rx.await.map_err(|_| CoreError::Disconnected)?
    }

    // ── REST API ─────────────────────────────────────────────────

    fn api(&self) -> Result<&PalworldClient, CoreError> {
        self.inner.api.as_ref().ok_or(CoreError::ApiNotConfigured)
    }

    pub fn has_api(&self) -> bool {
        self.inner.api.is_some()
    }

    pub async fn server_info(&self) -> Result<ServerInfo, CoreError> {
        Ok(self.api()?.info().await?)
    }

    pub async fn players(&self) -> Result<Vec<Player>, CoreError> {
        Ok(self.api()?.players().await?)
    }

    pub async fn kick(&self, uid: &str, message: Option<&str>) -> Result<(), CoreError> {
        Ok(self.api()?.kick(uid, message).await?)
    }

    pub async fn ban(&self, uid: &str, message: Option<&str>) -> Result<(), CoreError> {
        Ok(self.api()?.ban(uid, message).await?)
    }

    pub async fn unban(&self, uid: &str) -> Result<(), CoreError> {
        Ok(self.api()?.unban(uid).await?)
    }

    pub async fn teleport(&self, uid: &str, x: f64, y: f64, z: f64) -> Result<(), CoreError> {
        Ok(self.api()?.teleport(uid, x, y, z).await?)
    }

    pub async fn announce(&self, message: &str) -> Result<(), CoreError> {
        Ok(self.api()?.announce(message).await?)
    }

    pub async fn save_world(&self) -> Result<(), CoreError> {
        Ok(self.api()?.save().await?)
    }

    pub async fn shutdown(&self, wait_secs: u32, message: &str) -> Result<(), CoreError> {
        Ok(self.api()?.shutdown(wait_secs, message).await?)
    }

    /// Save the world, then schedule a shutdown. Nothing is shut down if
    /// the save fails.
    pub async fn shutdown_save(&self, wait_secs: u32, message: &str) -> Result<(), CoreError> {
        let api = self.api()?;
        api.save().await?;
        info!("world saved");
        api.shutdown(wait_secs, message).await?;
        info!(wait_secs, "shutdown scheduled");
        Ok(())
    }

    pub async fn probe_api(&self) -> Result<Reachability, CoreError> {
        Ok(self.api()?.probe().await?)
    }

    /// Refresh the player list every `period` until the receiver is
    /// dropped or the controller disconnects.
    ///
    /// The first refresh happens immediately. Ticks that come due while a
    /// refresh is still running are skipped, never stacked.
    pub async fn watch_players(
        &self,
        period: Duration,
    ) -> mpsc::Receiver<Result<Vec<Player>, CoreError>> {
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_SIZE);
        let ctrl = self.clone();
        let cancel = self.inner.cancel.child_token();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(player_watch_task(ctrl, period, cancel, tx)));
        rx
    }
}

/// Decrements the pending counter when a submission finishes.
struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn player_watch_task(
    controller: Controller,
    period: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<Vec<Player>, CoreError>>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let result = controller.players().await;
                if let Err(ref e) = result {
                    warn!(error = %e, "player refresh failed");
                }
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task(controller: Controller, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let name = envelope.command.name();
                debug!(command = name, "running");
                let result = route_command(&controller, envelope.command).await;
                if let Err(ref e) = result {
                    debug!(command = name, error = %e, "command failed");
                }
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let inner = &controller.inner;
    let server = &inner.server;

    match cmd {
        Command::Probe => {
            inner.session.probe().await?;
            Ok(CommandResult::Ok)
        }
        Command::Exec { command } => inner
            .session
            .run_remote_command(&command)
            .await
            .map(CommandResult::Output),
        Command::ListDir { path } => inner.session.list_dir(&path).await.map(CommandResult::Text),

        Command::ServerStatus => server.status().await.map(CommandResult::Status),
        Command::StartServer => {
            server.start().await?;
            Ok(CommandResult::Ok)
        }
        Command::StopServer => server.stop().await.map(CommandResult::Stopped),
        Command::RestartServer => {
            server.restart().await?;
            Ok(CommandResult::Ok)
        }
        Command::UpdateServer => {
            server.update().await?;
            Ok(CommandResult::Ok)
        }
        Command::UpdateStatus => server.is_update_running().await.map(CommandResult::Flag),
        Command::UpdateLog { lines } => server.update_log(lines).await.map(CommandResult::Text),
        Command::ServerLogs { lines } => server.server_logs(lines).await.map(CommandResult::Text),
        Command::SendConsole { command } => {
            server.send_console(&command).await?;
            Ok(CommandResult::Ok)
        }
        Command::Backup { local_dir } => server
            .backup_and_download(&local_dir)
            .await
            .map(CommandResult::Backup),

        Command::DownloadSettings => inner.sync.download().await.map(CommandResult::Path),
        Command::UploadSettings => {
            inner.sync.upload().await?;
            Ok(CommandResult::Ok)
        }
        Command::LocateSettings => inner.sync.locate().await.map(CommandResult::Located),
    }
}
