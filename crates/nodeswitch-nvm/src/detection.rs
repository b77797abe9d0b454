use std::path::PathBuf;

use log::debug;
use nodeswitch_platform::{ConfigStore, RegistryHive};
use which::which;

use crate::error::NvmError;
use crate::root::InstallationRoot;

pub const NVM_HOME_VAR: &str = "NVM_HOME";

const UNINSTALL_KEYS: [&str; 2] = [
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\nvm",
    r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall\nvm",
];
const INSTALL_LOCATION: &str = "InstallLocation";

/// Find the installation root: `NVM_HOME`, then the uninstall registry keys,
/// then well-known default locations. The first existing directory wins.
///
/// # Errors
/// Returns [`NvmError::NotFound`] listing every path tried when none exists.
pub fn locate_root(store: &dyn ConfigStore) -> Result<InstallationRoot, NvmError> {
    let env_home = std::env::var_os(NVM_HOME_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    select_root(env_home, registry_candidates(store), default_candidates())
}

/// Pick the first existing directory, in priority order.
///
/// # Errors
/// Returns [`NvmError::NotFound`] when no candidate is an existing directory.
pub fn select_root(
    env_home: Option<PathBuf>,
    registry: Vec<PathBuf>,
    defaults: Vec<PathBuf>,
) -> Result<InstallationRoot, NvmError> {
    let candidates: Vec<PathBuf> = env_home.into_iter().chain(registry).chain(defaults).collect();

    if let Some(found) = candidates.iter().find(|candidate| candidate.is_dir()) {
        debug!("Using installation root {}", found.display());
        return Ok(InstallationRoot::new(found.clone()));
    }

    let searched = if candidates.is_empty() {
        "no candidate locations".to_string()
    } else {
        candidates
            .iter()
            .map(|candidate| candidate.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    Err(NvmError::NotFound { searched })
}

fn registry_candidates(store: &dyn ConfigStore) -> Vec<PathBuf> {
    UNINSTALL_KEYS
        .iter()
        .filter_map(|key| store.read_string(RegistryHive::LocalMachine, key, INSTALL_LOCATION))
        .map(|location| PathBuf::from(location.trim()))
        .collect()
}

fn default_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(windows)]
    {
        if let Some(program_files) = std::env::var_os("ProgramFiles(x86)") {
            paths.push(PathBuf::from(program_files).join("nvm"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("AppData").join("Roaming").join("nvm"));
        }
    }

    #[cfg(not(windows))]
    {
        if let Some(data_dir) = dirs::data_dir() {
            paths.push(data_dir.join("nvm"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".nvm"));
        }
    }

    // nvm ships its executable inside the root it manages.
    if let Some(dir) = which("nvm")
        .ok()
        .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
    {
        paths.push(dir);
    }

    paths
}
