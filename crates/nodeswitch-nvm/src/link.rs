use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use nodeswitch_backend::NodeVersion;

use crate::error::NvmError;
use crate::root::InstallationRoot;

/// Point the active-version link at `root/<tag>`.
///
/// The new link is built under a temporary sibling name and then moved over
/// the old location, so a failure at any step leaves the previous link in
/// place. Whatever occupied the link location is replaced, never merged.
///
/// # Errors
/// Returns [`NvmError::VersionNotInstalled`] when the version directory is
/// missing, [`NvmError::LinkPathMissing`] when `settings.txt` names no link,
/// and [`NvmError::Link`] when the link cannot be created or moved.
pub fn switch(root: &InstallationRoot, version: &NodeVersion) -> Result<PathBuf, NvmError> {
    let tag = version.tag();
    let target = root.version_dir(version);
    if !target.is_dir() {
        return Err(NvmError::VersionNotInstalled(tag));
    }
    let target = std::path::absolute(&target)
        .map_err(|error| NvmError::link(&tag, "failed to resolve version directory", error))?;

    let link = root.link_path()?;
    if let Some(parent) = link.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|error| NvmError::link(&tag, "failed to create link parent directory", error))?;
    }

    let staged = sibling(&link, "new");
    create_dir_link(&target, &staged)
        .map_err(|error| NvmError::link(&tag, "failed to create directory link", error))?;

    if let Err(error) = replace(&staged, &link) {
        if let Err(cleanup) = remove_entry(&staged) {
            warn!("Failed to remove staged link {}: {cleanup}", staged.display());
        }
        return Err(NvmError::link(&tag, "failed to replace active link", error));
    }

    info!("Switched {} to {}", link.display(), target.display());
    Ok(link)
}

fn replace(staged: &Path, link: &Path) -> std::io::Result<()> {
    let existing = match std::fs::symlink_metadata(link) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return std::fs::rename(staged, link);
        }
        Err(error) => return Err(error),
    };

    // rename(2) swaps one symlink for another atomically.
    if cfg!(unix) && existing.file_type().is_symlink() {
        return std::fs::rename(staged, link);
    }

    let backup = sibling(link, "old");
    std::fs::rename(link, &backup)?;
    if let Err(error) = std::fs::rename(staged, link) {
        if let Err(restore) = std::fs::rename(&backup, link) {
            warn!(
                "Failed to restore previous link from {}: {restore}",
                backup.display()
            );
        }
        return Err(error);
    }

    if let Err(error) = remove_entry(&backup) {
        warn!("Failed to remove previous link {}: {error}", backup.display());
    }
    Ok(())
}

fn sibling(link: &Path, purpose: &str) -> PathBuf {
    let name = link
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let path = link.with_file_name(format!(
        ".{name}.nodeswitch-{purpose}-{}-{nanos}",
        std::process::id()
    ));
    debug!("Staging link at {}", path.display());
    path
}

/// Remove a file, a link, or a whole directory without following links.
fn remove_entry(path: &Path) -> std::io::Result<()> {
    let file_type = std::fs::symlink_metadata(path)?.file_type();
    if file_type.is_file() {
        return std::fs::remove_file(path);
    }
    #[cfg(windows)]
    {
        if file_type.is_symlink() {
            return std::fs::remove_dir(path).or_else(|_| std::fs::remove_file(path));
        }
    }
    std::fs::remove_dir_all(path)
}

#[cfg(unix)]
fn create_dir_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_dir_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
