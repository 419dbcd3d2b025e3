// Settings-file synchronisation between the VPS and the local staging copy.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::info;

use crate::config::SyncPaths;
use crate::error::CoreError;
use crate::remote::RemoteSession;
use crate::settings::{WorldSettings, apply_changes};

/// Moves `PalWorldSettings.ini` along its remote/local path pair and
/// edits the staged copy.
#[derive(Clone)]
pub struct ConfigSync {
    session: RemoteSession,
    paths: SyncPaths,
}

impl ConfigSync {
    pub fn new(session: RemoteSession, paths: SyncPaths) -> Self {
        Self { session, paths }
    }

    pub fn paths(&self) -> &SyncPaths {
        &self.paths
    }

    pub fn local_path(&self) -> &Path {
        &self.paths.local_config
    }

    /// Fetch the remote settings file into the staging path.
    pub async fn download(&self) -> Result<PathBuf, CoreError> {
        self.session
            .download_file(&self.paths.remote_config, &self.paths.local_config)
            .await?;
        info!(path = %self.paths.local_config.display(), "settings downloaded");
        Ok(self.paths.local_config.clone())
    }

    /// Push the staged settings file to the VPS.
    pub async fn upload(&self) -> Result<(), CoreError> {
        self.session
            .upload_file(&self.paths.local_config, &self.paths.remote_config)
            .await?;
        info!(remote = %self.paths.remote_config, "settings uploaded");
        Ok(())
    }

    /// Look for the settings file next to the configured remote path.
    pub async fn locate(&self) -> Result<Option<String>, CoreError> {
        let dir = self
            .paths
            .remote_config
            .rsplit_once('/')
            .map_or(".", |(dir, _)| dir);
        self.session.find_config_file(dir).await
    }

    /// Parse the staged settings file.
    pub async fn load_local(&self) -> Result<WorldSettings, CoreError> {
        let content = self.read_local().await?;
        WorldSettings::parse(&content)
    }

    /// Apply `changes` to the staged file in place.
    ///
    /// The merged result is validated before anything is written; an
    /// invalid value leaves the file untouched.
    pub async fn edit_local(
        &self,
        changes: &IndexMap<String, String>,
    ) -> Result<WorldSettings, CoreError> {
        let original = self.read_local().await?;
        let updated = apply_changes(&original, changes)?;
        let settings = WorldSettings::parse(&updated)?;

        let issues = settings.validate();
        if !issues.is_empty() {
            let message = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CoreError::Validation { message });
        }

        if updated != original {
            tokio::fs::write(&self.paths.local_config, &updated).await?;
            info!(changed = changes.len(), "staged settings updated");
        }
        Ok(settings)
    }

    async fn read_local(&self) -> Result<String, CoreError> {
        tokio::fs::read_to_string(&self.paths.local_config)
            .await
            .map_err(|e| CoreError::LocalPath {
                path: self.paths.local_config.display().to_string(),
                reason: e.to_string(),
            })
    }
}
