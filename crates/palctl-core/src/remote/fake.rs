// In-memory transport for exercising orchestration without a VPS.
//
// Commands are matched against scripted rules by substring, in the order
// the rules were added. Unmatched commands succeed with empty output,
// except `test -d` checks, which report the directory as present.
// Remote files live in a map keyed by the path the session hands over.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{CommandOutput, RemoteTransport};
use crate::error::CoreError;

struct Rule {
    pattern: String,
    queued: VecDeque<CommandOutput>,
    last: CommandOutput,
}

#[derive(Default)]
struct FakeState {
    rules: Vec<Rule>,
    commands: Vec<String>,
    files: HashMap<String, Vec<u8>>,
    downloads: Vec<String>,
    uploads: Vec<String>,
    upload_failure: Option<String>,
    download_failure: Option<String>,
    fallback_file: Option<Vec<u8>>,
}

/// Scriptable [`RemoteTransport`] that records everything it is asked to do.
#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long while counted as in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Scripting ────────────────────────────────────────────────

    /// Commands containing `pattern` always produce `output`.
    pub fn respond(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.respond_seq(pattern, vec![output])
    }

    /// Commands containing `pattern` produce `outputs` in turn; the last
    /// one repeats once the queue is drained.
    pub fn respond_seq(&self, pattern: &str, outputs: Vec<CommandOutput>) -> &Self {
        let mut queued: VecDeque<_> = outputs.into();
        let last = queued.back().cloned().unwrap_or_default();
        if queued.len() == 1 {
            queued.clear();
        }
        self.state().rules.push(Rule {
            pattern: pattern.to_owned(),
            queued,
            last,
        });
        self
    }

    /// Place a file on the fake remote filesystem.
    pub fn put_file(&self, remote: &str, contents: impl Into<Vec<u8>>) -> &Self {
        self.state().files.insert(remote.to_owned(), contents.into());
        self
    }

    /// Serve `contents` for downloads of paths not on the fake filesystem,
    /// e.g. archives whose names carry a timestamp.
    pub fn serve_missing_as(&self, contents: impl Into<Vec<u8>>) -> &Self {
        self.state().fallback_file = Some(contents.into());
        self
    }

    pub fn fail_uploads(&self, reason: &str) -> &Self {
        self.state().upload_failure = Some(reason.to_owned());
        self
    }

    pub fn fail_downloads(&self, reason: &str) -> &Self {
        self.state().download_failure = Some(reason.to_owned());
        self
    }

    // ── Inspection ───────────────────────────────────────────────

    /// Commands executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Whether any executed command contains `needle`.
    pub fn ran(&self, needle: &str) -> bool {
        self.state().commands.iter().any(|c| c.contains(needle))
    }

    pub fn file(&self, remote: &str) -> Option<Vec<u8>> {
        self.state().files.get(remote).cloned()
    }

    /// Remote paths requested by `download`, successful or not.
    pub fn downloads(&self) -> Vec<String> {
        self.state().downloads.clone()
    }

    /// Remote paths written by `upload`, successful or not.
    pub fn uploads(&self) -> Vec<String> {
        self.state().uploads.clone()
    }

    /// Highest number of calls that were ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        InFlight(&self.in_flight)
    }

    fn scripted(&self, command: &str) -> CommandOutput {
        let mut state = self.state();
        state.commands.push(command.to_owned());
        state
            .rules
            .iter_mut()
            .find(|r| command.contains(&r.pattern))
            .map_or_else(
                || {
                    if command.starts_with("test -d ") {
                        CommandOutput::ok("EXISTS\n")
                    } else {
                        CommandOutput::ok("")
                    }
                },
                |rule| rule.queued.pop_front().unwrap_or_else(|| rule.last.clone()),
            )
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteTransport for FakeTransport {
    fn target(&self) -> String {
        "fake".into()
    }

    async fn exec(&self, command: &str, _timeout: Duration) -> Result<CommandOutput, CoreError> {
        let _guard = self.enter().await;
        Ok(self.scripted(command))
    }

    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        _timeout: Duration,
    ) -> Result<(), CoreError> {
        let _guard = self.enter().await;
        let failure = {
            let mut state = self.state();
            state.uploads.push(remote.to_owned());
            state.upload_failure.clone()
        };
        if let Some(reason) = failure {
            return Err(CoreError::TransferFailed {
                from: local.display().to_string(),
                to: remote.to_owned(),
                reason,
            });
        }

        let bytes = tokio::fs::read(local).await?;
        self.state().files.insert(remote.to_owned(), bytes);
        Ok(())
    }

    async fn download(
        &self,
        remote: &str,
        local: &Path,
        _timeout: Duration,
    ) -> Result<(), CoreError> {
        let _guard = self.enter().await;
        let (failure, contents) = {
            let mut state = self.state();
            state.downloads.push(remote.to_owned());
            let contents = state
                .files
                .get(remote)
                .cloned()
                .or_else(|| state.fallback_file.clone());
            (state.download_failure.clone(), contents)
        };

        let transfer_failed = |reason: String| CoreError::TransferFailed {
            from: remote.to_owned(),
            to: local.display().to_string(),
            reason,
        };

        if let Some(reason) = failure {
            return Err(transfer_failed(reason));
        }
        let bytes = contents.ok_or_else(|| transfer_failed("no such file or directory".into()))?;
        tokio::fs::write(local, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rules_match_in_order_and_sequences_repeat_last() {
        let fake = FakeTransport::new();
        fake.respond_seq(
            "screen -list",
            vec![CommandOutput::ok("1234.palworld_server"), CommandOutput::failed(1, "")],
        );
        fake.respond("screen", CommandOutput::failed(9, "never"));

        let t = Duration::from_secs(1);
        assert_eq!(fake.exec("screen -list", t).await.unwrap().exit_code, 0);
        assert_eq!(fake.exec("screen -list", t).await.unwrap().exit_code, 1);
        assert_eq!(fake.exec("screen -list", t).await.unwrap().exit_code, 1);
        assert_eq!(fake.exec("screen -S x", t).await.unwrap().exit_code, 9);
        assert!(fake.exec("uptime", t).await.unwrap().success());
        assert_eq!(fake.commands().len(), 5);
    }

    #[tokio::test]
    async fn missing_remote_file_fails_download() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::new();
        let err = fake
            .download("/nope", &dir.path().join("x"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TransferFailed { .. }));
        assert_eq!(fake.downloads(), vec!["/nope".to_string()]);
    }
}
