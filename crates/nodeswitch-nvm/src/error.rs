use std::path::PathBuf;

use nodeswitch_backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NvmError {
    #[error("nvm installation not found (searched: {searched})")]
    NotFound { searched: String },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read link location from {}: {details}", .settings.display())]
    LinkPathMissing { settings: PathBuf, details: String },

    #[error("Version not installed: {0}")]
    VersionNotInstalled(String),

    #[error("failed to switch to {version}: {context}: {source}")]
    Link {
        version: String,
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{} --version did not finish in time", .marker.display())]
    QueryTimeout { marker: PathBuf },

    #[error("{} --version failed: {details}", .marker.display())]
    QueryFailed { marker: PathBuf, details: String },
}

impl NvmError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn link(version: &str, context: &'static str, source: std::io::Error) -> Self {
        Self::Link {
            version: version.to_string(),
            context,
            source,
        }
    }
}

impl From<NvmError> for BackendError {
    fn from(error: NvmError) -> Self {
        match error {
            NvmError::NotFound { searched } => BackendError::InstallationNotFound { searched },
            NvmError::LinkPathMissing { settings, details } => BackendError::ConfigurationMissing {
                path: settings,
                details,
            },
            NvmError::VersionNotInstalled(version) => BackendError::VersionNotInstalled { version },
            NvmError::Link {
                version,
                context,
                source,
            } => BackendError::Switch {
                version,
                kind: source.kind(),
                details: format!("{context}: {source}"),
            },
            NvmError::Io { context, source } => BackendError::IoError {
                kind: source.kind(),
                message: format!("{context}: {source}"),
            },
            error @ NvmError::QueryTimeout { .. } => BackendError::IoError {
                kind: std::io::ErrorKind::TimedOut,
                message: error.to_string(),
            },
            error @ NvmError::QueryFailed { .. } => BackendError::IoError {
                kind: std::io::ErrorKind::Other,
                message: error.to_string(),
            },
        }
    }
}
