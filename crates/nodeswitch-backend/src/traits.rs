use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::types::{InstallProgress, InstalledVersion, NodeVersion, RemoteVersion};

/// Progress events are delivered best-effort; a full or closed channel drops them.
pub type ProgressSender = tokio::sync::mpsc::Sender<InstallProgress>;

#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub name: &'static str,
    pub root: PathBuf,
    pub link_path: Option<PathBuf>,
    pub index_url: String,
}

#[async_trait]
pub trait VersionManager: Send + Sync {
    fn name(&self) -> &'static str;

    fn backend_info(&self) -> &BackendInfo;

    async fn list_installed(&self) -> Result<Vec<InstalledVersion>, BackendError>;

    async fn list_remote(&self) -> Result<Vec<RemoteVersion>, BackendError>;

    /// The active version, or `None` when there is none or it cannot be read.
    async fn current_version(&self) -> Option<NodeVersion>;

    async fn install(
        &self,
        version: &NodeVersion,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<(), BackendError>;

    async fn use_version(&self, version: &NodeVersion) -> Result<(), BackendError>;

    async fn is_installed(&self, version: &NodeVersion) -> Result<bool, BackendError> {
        let installed = self.list_installed().await?;
        Ok(installed.iter().any(|v| v.version == *version))
    }

    async fn install_and_use(
        &self,
        version: &NodeVersion,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<(), BackendError> {
        self.install(version, progress, cancel).await?;
        self.use_version(version).await
    }
}
