use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use nodeswitch_backend::{
    BackendError, BackendInfo, InstalledVersion, NodeVersion, ProgressSender, RemoteVersion,
    VersionManager,
};
use nodeswitch_core::{CatalogError, Installer, ReleaseIndex};

use crate::active::{current_active, query_active};
use crate::catalog::list_installed;
use crate::link::switch;
use crate::root::InstallationRoot;

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct NvmBackend {
    info: BackendInfo,
    root: InstallationRoot,
    client: reqwest::Client,
    query_timeout: Duration,
    temp_dir: Option<PathBuf>,
}

impl NvmBackend {
    #[must_use]
    pub fn new(root: InstallationRoot, client: reqwest::Client, index_url: &str) -> Self {
        let link_path = root.link_path().ok();
        Self {
            info: BackendInfo {
                name: "nvm",
                root: root.path().to_path_buf(),
                link_path,
                index_url: index_url.to_string(),
            },
            root,
            client,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            temp_dir: None,
        }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Stage downloaded archives in `dir` rather than the system temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    #[must_use]
    pub fn root(&self) -> &InstallationRoot {
        &self.root
    }

    /// Distinguishes "nothing active" from "detection failed", unlike
    /// [`VersionManager::current_version`].
    ///
    /// # Errors
    /// Returns an error when the link or the executable behind it cannot be read.
    pub async fn query_current(&self) -> Result<Option<NodeVersion>, BackendError> {
        query_active(&self.root, self.query_timeout)
            .await
            .map_err(BackendError::from)
    }

    fn release_index(&self) -> Result<ReleaseIndex, BackendError> {
        ReleaseIndex::for_host(&self.info.index_url)
            .map_err(|error| BackendError::from(CatalogError::Platform(error)))
    }
}

#[async_trait]
impl VersionManager for NvmBackend {
    fn name(&self) -> &'static str {
        "nvm"
    }

    fn backend_info(&self) -> &BackendInfo {
        &self.info
    }

    async fn list_installed(&self) -> Result<Vec<InstalledVersion>, BackendError> {
        debug!("nvm: listing installed versions");
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || list_installed(&root))
            .await
            .map_err(|error| BackendError::IoError {
                kind: std::io::ErrorKind::Other,
                message: error.to_string(),
            })?
            .map_err(BackendError::from)
    }

    async fn list_remote(&self) -> Result<Vec<RemoteVersion>, BackendError> {
        debug!("nvm: listing remote versions");
        let index = self.release_index()?;
        Ok(index.fetch_available(&self.client).await?)
    }

    async fn current_version(&self) -> Option<NodeVersion> {
        debug!("nvm: getting current version");
        current_active(&self.root, self.query_timeout).await
    }

    async fn install(
        &self,
        version: &NodeVersion,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<(), BackendError> {
        info!("nvm: installing version {version}");
        let mut installer = Installer::new(self.client.clone(), self.release_index()?);
        if let Some(dir) = &self.temp_dir {
            installer = installer.with_temp_dir(dir.clone());
        }
        installer
            .install(self.root.path(), version, progress.as_ref(), &cancel)
            .await?;
        Ok(())
    }

    /// Checks the version directory directly, the same test `switch` makes,
    /// so a root that does not exist yet simply has nothing installed.
    async fn is_installed(&self, version: &NodeVersion) -> Result<bool, BackendError> {
        Ok(self.root.version_dir(version).is_dir())
    }

    async fn use_version(&self, version: &NodeVersion) -> Result<(), BackendError> {
        info!("nvm: using version {version}");
        let root = self.root.clone();
        let version = *version;
        tokio::task::spawn_blocking(move || switch(&root, &version))
            .await
            .map_err(|error| BackendError::IoError {
                kind: std::io::ErrorKind::Other,
                message: error.to_string(),
            })??;
        Ok(())
    }
}
