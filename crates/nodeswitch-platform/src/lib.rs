mod commands;
mod config_store;
mod paths;
mod system;

pub use commands::HideWindow;
pub use config_store::{ConfigStore, MemoryConfigStore, RegistryHive, SystemConfigStore};
pub use paths::{AppPaths, AppPathsError, NODESWITCH_HOME_VAR, create_parent};
pub use system::{Arch, Platform, PlatformError, SystemInfo};
