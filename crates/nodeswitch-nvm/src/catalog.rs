use chrono::{DateTime, Utc};
use log::{debug, warn};
use nodeswitch_backend::{InstalledVersion, NodeVersion};

use crate::active::active_target;
use crate::error::NvmError;
use crate::root::InstallationRoot;

/// Every `vX.Y.Z` subdirectory of the root, newest first. Anything else in
/// the root is ignored.
///
/// # Errors
/// Returns an error when the root itself cannot be read.
pub fn list_installed(root: &InstallationRoot) -> Result<Vec<InstalledVersion>, NvmError> {
    let entries = std::fs::read_dir(root.path())
        .map_err(|error| NvmError::io("failed to read installation root", error))?;

    let active = match active_target(root) {
        Ok(target) => target,
        Err(error) => {
            debug!("Active version unavailable while listing: {error}");
            None
        }
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!("Skipping unreadable entry in installation root: {error}");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(version) = entry.file_name().to_str().and_then(NodeVersion::from_tag) else {
            continue;
        };

        let install_date = std::fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let is_active = active.as_ref().is_some_and(|target| {
            std::fs::canonicalize(&path).is_ok_and(|canonical| &canonical == target)
        });

        versions.push(InstalledVersion {
            version,
            path,
            is_active,
            install_date,
        });
    }

    versions.sort_by(|a, b| b.version.cmp(&a.version));
    debug!("Found {} installed versions", versions.len());
    Ok(versions)
}
