use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use nodeswitch_backend::NodeVersion;
use nodeswitch_platform::HideWindow;
use tokio::process::Command;

use crate::error::NvmError;
use crate::root::InstallationRoot;

/// The directory the active-version link currently resolves to.
///
/// `Ok(None)` covers an absent link as well as a dangling one.
///
/// # Errors
/// Returns an error when the link location is not configured or cannot be
/// resolved for a reason other than absence.
pub fn active_target(root: &InstallationRoot) -> Result<Option<PathBuf>, NvmError> {
    let link = root.link_path()?;
    match std::fs::canonicalize(&link) {
        Ok(target) if target.is_dir() => Ok(Some(target)),
        Ok(_) => Ok(None),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(NvmError::io("failed to resolve active version link", error)),
    }
}

/// The `node` executable inside a version directory, if present.
#[must_use]
pub fn marker_path(version_dir: &Path) -> Option<PathBuf> {
    #[cfg(windows)]
    let candidates = [version_dir.join("node.exe")];
    #[cfg(not(windows))]
    let candidates = [version_dir.join("bin").join("node"), version_dir.join("node")];

    candidates.into_iter().find(|candidate| candidate.is_file())
}

/// Ask the active version's executable for its version.
///
/// `Ok(None)` means nothing is active; an error means detection itself broke.
///
/// # Errors
/// Returns an error when the link cannot be resolved or the executable fails,
/// times out, or prints no version.
pub async fn query_active(
    root: &InstallationRoot,
    timeout: Duration,
) -> Result<Option<NodeVersion>, NvmError> {
    let Some(target) = active_target(root)? else {
        debug!("No active version link");
        return Ok(None);
    };
    let Some(marker) = marker_path(&target) else {
        debug!("Active directory {} has no node executable", target.display());
        return Ok(None);
    };

    let output = tokio::time::timeout(
        timeout,
        Command::new(&marker)
            .arg("--version")
            .hide_window()
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| NvmError::QueryTimeout {
        marker: marker.clone(),
    })?
    .map_err(|error| NvmError::QueryFailed {
        marker: marker.clone(),
        details: error.to_string(),
    })?;

    if !output.status.success() {
        return Err(NvmError::QueryFailed {
            marker,
            details: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = NodeVersion::parse_lenient(&stdout);
    if version.is_unknown() {
        return Err(NvmError::QueryFailed {
            marker,
            details: format!("unrecognised output {:?}", stdout.trim()),
        });
    }

    debug!("Active version is {version}");
    Ok(Some(version))
}

/// Like [`query_active`], but failures are logged and read as "none".
pub async fn current_active(root: &InstallationRoot, timeout: Duration) -> Option<NodeVersion> {
    match query_active(root, timeout).await {
        Ok(version) => version,
        Err(error) => {
            warn!("Could not determine active version: {error}");
            None
        }
    }
}
