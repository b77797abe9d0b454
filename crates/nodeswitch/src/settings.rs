use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use nodeswitch_platform::{AppPaths, create_parent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Installation root to use instead of the located one.
    #[serde(default)]
    pub nvm_home: Option<PathBuf>,

    /// Release index mirror; also taken from nvm's `node_mirror` when unset.
    #[serde(default)]
    pub index_url: Option<String>,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,

    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default)]
    pub activate_after_install: bool,
}

fn default_http_timeout() -> u64 {
    10
}

fn default_install_timeout() -> u64 {
    600
}

fn default_query_timeout() -> u64 {
    10
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            nvm_home: None,
            index_url: None,
            http_timeout_secs: default_http_timeout(),
            install_timeout_secs: default_install_timeout(),
            query_timeout_secs: default_query_timeout(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            activate_after_install: false,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        match AppPaths::new() {
            Ok(paths) => Self::load_from(paths.settings_file()),
            Err(_) => Self::default(),
        }
    }

    /// Missing or malformed files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, paths: &AppPaths) -> Result<(), std::io::Error> {
        self.save_to(paths.settings_file())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        create_parent(path)?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }
}
