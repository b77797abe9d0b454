use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Version manager installation not found (searched: {searched})")]
    InstallationNotFound { searched: String },

    #[error("Configuration missing in {}: {details}", .path.display())]
    ConfigurationMissing { path: PathBuf, details: String },

    #[error("Version not installed: {version}")]
    VersionNotInstalled { version: String },

    #[error("Failed to switch to {version}: {details}")]
    Switch {
        version: String,
        kind: std::io::ErrorKind,
        details: String,
    },

    #[error("Network error during {operation} ({stage}): {details}")]
    NetworkError {
        operation: &'static str,
        stage: NetworkStage,
        details: String,
    },

    #[error("Unsupported platform ({os}) or architecture ({arch})")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Installation failed during {phase}: {details}")]
    InstallFailed {
        phase: &'static str,
        details: String,
    },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: &'static str },

    #[error("IO error ({kind}): {message}")]
    IoError {
        kind: std::io::ErrorKind,
        message: String,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("response status")]
    Status,
    #[error("response body")]
    Body,
}

impl BackendError {
    pub fn install_failed(phase: &'static str, details: impl Into<String>) -> Self {
        Self::InstallFailed {
            phase,
            details: details.into(),
        }
    }

    pub fn network(
        operation: &'static str,
        stage: NetworkStage,
        details: impl Into<String>,
    ) -> Self {
        Self::NetworkError {
            operation,
            stage,
            details: details.into(),
        }
    }

    /// Whether the failure came from the OS refusing the operation, which is
    /// the usual outcome of creating a directory link without the privilege.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Switch { kind, details, .. } => {
                *kind == std::io::ErrorKind::PermissionDenied || details.contains("os error 1314")
            }
            Self::IoError { kind, .. } => *kind == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
