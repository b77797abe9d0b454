use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Puts every file nodeswitch writes into one directory when set.
pub const NODESWITCH_HOME_VAR: &str = "NODESWITCH_HOME";

const APP_DIR: &str = "nodeswitch";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "nodeswitch.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no per-user {0} directory on this system; set {NODESWITCH_HOME_VAR}")]
pub struct AppPathsError(&'static str);

/// The files nodeswitch owns. Unrelated to the installation root it manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    settings_file: PathBuf,
    log_file: PathBuf,
}

impl AppPaths {
    /// `NODESWITCH_HOME` when set, otherwise the platform's per-user config
    /// directory for settings and local data directory for the log.
    ///
    /// # Errors
    /// Returns an error when the platform reports no such directory.
    pub fn new() -> Result<Self, AppPathsError> {
        Self::resolve(std::env::var_os(NODESWITCH_HOME_VAR))
    }

    fn resolve(home: Option<OsString>) -> Result<Self, AppPathsError> {
        if let Some(home) = home.filter(|home| !home.is_empty()) {
            return Ok(Self::in_dir(Path::new(&home)));
        }
        Ok(Self {
            settings_file: user_dir(dirs::config_dir(), "config")?.join(SETTINGS_FILE),
            log_file: user_dir(dirs::data_local_dir(), "data")?.join(LOG_FILE),
        })
    }

    /// Both files side by side in `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            settings_file: dir.join(SETTINGS_FILE),
            log_file: dir.join(LOG_FILE),
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

fn user_dir(base: Option<PathBuf>, kind: &'static str) -> Result<PathBuf, AppPathsError> {
    base.map(|base| base.join(APP_DIR))
        .ok_or(AppPathsError(kind))
}

/// Create the directory `file` goes in, if it has one.
///
/// # Errors
/// Returns the I/O error from creating the directory.
pub fn create_parent(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
