use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use futures_util::StreamExt;
use log::{debug, info, warn};
use nodeswitch_backend::{InstallPhase, InstallProgress, NodeVersion, ProgressSender};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::archive::{extract_zip, flatten_wrapper};
use crate::catalog::ReleaseIndex;
use crate::error::InstallError;

/// Downloads release archives and unpacks them into an installation root.
#[derive(Debug, Clone)]
pub struct Installer {
    client: reqwest::Client,
    index: ReleaseIndex,
    temp_dir: Option<PathBuf>,
}

impl Installer {
    #[must_use]
    pub fn new(client: reqwest::Client, index: ReleaseIndex) -> Self {
        Self {
            client,
            index,
            temp_dir: None,
        }
    }

    /// Stage downloads in `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    /// Download `version` and lay it out as `root/<tag>`.
    ///
    /// The archive is staged in a temporary file that is removed whatever
    /// the outcome. A version directory created by this call is removed again
    /// when a later step fails; a pre-existing one is overwritten in place.
    ///
    /// # Errors
    /// Returns an error when another install of the same tag holds the lock,
    /// on download or extraction failure, or when `cancel` fires before the
    /// archive is fully downloaded.
    pub async fn install(
        &self,
        root: &Path,
        version: &NodeVersion,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError> {
        std::fs::create_dir_all(root).map_err(|error| {
            InstallError::io_with_path("failed to create installation root", root, &error)
        })?;
        let _lock = InstallLock::acquire(root, version)?;

        let target = root.join(version.tag());
        let created = !target.exists();
        let url = self.index.download_url(version);

        info!("Installing {version} from {url}");
        let result = self
            .download_and_unpack(&url, &target, progress, cancel)
            .await;

        match result {
            Ok(()) => {
                report(progress, InstallProgress::phase(InstallPhase::Complete));
                info!("Installed {version} to {}", target.display());
                Ok(target)
            }
            Err(error) => {
                if created
                    && target.exists()
                    && let Err(cleanup) = std::fs::remove_dir_all(&target)
                {
                    warn!(
                        "Failed to remove partial install at {}: {cleanup}",
                        target.display()
                    );
                }
                Err(error)
            }
        }
    }

    async fn download_and_unpack(
        &self,
        url: &str,
        target: &Path,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let archive = self.download(url, progress, cancel).await?;
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        report(progress, InstallProgress::phase(InstallPhase::Extracting));
        std::fs::create_dir_all(target).map_err(|error| {
            InstallError::io_with_path("failed to create version directory", target, &error)
        })?;

        let dest = target.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let wrapper = extract_zip(archive.path(), &dest)?;
            drop(archive);
            if let Some(wrapper) = wrapper {
                flatten_wrapper(&dest, &wrapper)?;
            }
            Ok::<(), InstallError>(())
        })
        .await
        .map_err(|error| InstallError::Task(error.to_string()))??;

        report(progress, InstallProgress::phase(InstallPhase::Finalizing));
        Ok(())
    }

    async fn download(
        &self,
        url: &str,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<NamedTempFile, InstallError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".nodeswitch-").suffix(".zip");
        let staged = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|error| InstallError::io("failed to create download file", error))?;

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InstallError::Cancelled),
            response = self.client.get(url).send() => response
                .map_err(|error| InstallError::http("download request failed", error))?,
        };

        if !response.status().is_success() {
            return Err(InstallError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let total = response.content_length().filter(|total| *total > 0);
        let mut downloaded: u64 = 0;
        report(progress, InstallProgress::phase(InstallPhase::Downloading));

        let handle = staged
            .as_file()
            .try_clone()
            .map_err(|error| InstallError::io("failed to open download file", error))?;
        let mut file = tokio::fs::File::from_std(handle);

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(InstallError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|error| InstallError::http("download stream error", error))?;
            file.write_all(&chunk).await.map_err(|error| {
                InstallError::io_with_path("failed to write download data", staged.path(), &error)
            })?;
            downloaded += chunk.len() as u64;
            if let Some(total) = total {
                report(progress, InstallProgress::downloading(downloaded, total));
            }
        }

        file.flush().await.map_err(|error| {
            InstallError::io_with_path("failed to flush download file", staged.path(), &error)
        })?;

        debug!("Download complete: {downloaded} bytes");
        Ok(staged)
    }
}

fn report(progress: Option<&ProgressSender>, event: InstallProgress) {
    if let Some(sender) = progress {
        let _ = sender.try_send(event);
    }
}

/// Exclusive per-version lock so two installs never write the same directory.
///
/// The lock file stays on disk after release. Unlinking it while the handle
/// is open would let two waiters lock different inodes of the same name.
struct InstallLock {
    _file: File,
}

impl InstallLock {
    fn acquire(root: &Path, version: &NodeVersion) -> Result<Self, InstallError> {
        let path = root.join(format!(".{}.install.lock", version.tag()));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|error| {
                InstallError::io_with_path("failed to open install lock", &path, &error)
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { _file: file }),
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
            {
                Err(InstallError::Busy {
                    version: version.tag(),
                })
            }
            Err(error) => Err(InstallError::io_with_path(
                "failed to acquire install lock",
                &path,
                &error,
            )),
        }
    }
}
