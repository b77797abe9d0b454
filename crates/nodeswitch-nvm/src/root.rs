use std::path::{Path, PathBuf};

use nodeswitch_backend::NodeVersion;

use crate::error::NvmError;
use crate::settings::NvmSettings;

const SETTINGS_FILE: &str = "settings.txt";

/// The directory holding one subdirectory per installed version plus
/// `settings.txt`. Built once and handed to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRoot {
    path: PathBuf,
}

impl InstallationRoot {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn version_dir(&self, version: &NodeVersion) -> PathBuf {
        self.path.join(version.tag())
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.path.join(SETTINGS_FILE)
    }

    /// # Errors
    /// Returns an error when `settings.txt` cannot be read.
    pub fn settings(&self) -> Result<NvmSettings, NvmError> {
        let file = self.settings_file();
        NvmSettings::load(&file).map_err(|error| NvmError::LinkPathMissing {
            settings: file,
            details: error.to_string(),
        })
    }

    /// Location of the directory link named by the `path:` setting.
    ///
    /// # Errors
    /// Returns an error when `settings.txt` is unreadable or has no `path:`.
    pub fn link_path(&self) -> Result<PathBuf, NvmError> {
        self.settings()?
            .path
            .ok_or_else(|| NvmError::LinkPathMissing {
                settings: self.settings_file(),
                details: "no `path:` entry".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_dir_uses_tag() {
        let root = InstallationRoot::new("/opt/nvm");

        assert_eq!(
            root.version_dir(&NodeVersion::new(20, 11, 1)),
            PathBuf::from("/opt/nvm/v20.11.1")
        );
        assert_eq!(root.settings_file(), PathBuf::from("/opt/nvm/settings.txt"));
    }

    #[test]
    fn link_path_reads_path_entry() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        std::fs::write(
            temp.path().join("settings.txt"),
            "root: /opt/nvm\npath: /opt/nodejs\n",
        )
        .expect("settings should be written");

        let root = InstallationRoot::new(temp.path());

        assert_eq!(
            root.link_path().expect("link path should resolve"),
            PathBuf::from("/opt/nodejs")
        );
    }

    #[test]
    fn link_path_without_entry_is_configuration_missing() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        std::fs::write(temp.path().join("settings.txt"), "root: /opt/nvm\n")
            .expect("settings should be written");

        let result = InstallationRoot::new(temp.path()).link_path();

        assert!(matches!(result, Err(NvmError::LinkPathMissing { .. })));
    }

    #[test]
    fn link_path_without_settings_file_is_configuration_missing() {
        let temp = tempfile::tempdir().expect("tempdir should be created");

        let result = InstallationRoot::new(temp.path()).link_path();

        assert!(matches!(
            result,
            Err(NvmError::LinkPathMissing { ref settings, .. })
                if settings == &temp.path().join("settings.txt")
        ));
    }
}
