mod active;
mod backend;
mod catalog;
mod detection;
mod error;
mod link;
mod root;
mod settings;

pub use active::{active_target, current_active, marker_path, query_active};
pub use backend::NvmBackend;
pub use catalog::list_installed;
pub use detection::{NVM_HOME_VAR, locate_root, select_root};
pub use error::NvmError;
pub use link::switch;
pub use root::InstallationRoot;
pub use settings::NvmSettings;

pub use nodeswitch_backend::{
    BackendError, BackendInfo, InstalledVersion, NodeVersion, RemoteVersion, VersionManager,
};
