mod error;
mod traits;
mod types;

pub use error::{BackendError, NetworkStage};
pub use traits::{BackendInfo, ProgressSender, VersionManager};
pub use types::{
    InstallPhase, InstallProgress, InstalledVersion, NodeVersion, RemoteVersion,
    VersionComponent, VersionParseError,
};
