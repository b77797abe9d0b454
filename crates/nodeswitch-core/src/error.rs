use std::path::Path;

use nodeswitch_backend::{BackendError, NetworkStage};
use nodeswitch_platform::PlatformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("failed to fetch release index: {0}")]
    Request(#[source] reqwest::Error),
    #[error("release index request failed with HTTP {status}{body_snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("failed to read release index: {0}")]
    Body(#[source] reqwest::Error),
}

impl From<CatalogError> for BackendError {
    fn from(error: CatalogError) -> Self {
        let stage = match &error {
            CatalogError::Platform(PlatformError::Unsupported { os, arch }) => {
                return BackendError::UnsupportedPlatform {
                    os: os.clone(),
                    arch: arch.clone(),
                };
            }
            CatalogError::Request(_) => NetworkStage::Request,
            CatalogError::HttpStatus { .. } => NetworkStage::Status,
            CatalogError::Body(_) => NetworkStage::Body,
        };
        BackendError::network("fetch release index", stage, error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} failed with HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("install of {version} is already in progress")]
    Busy { version: String },
    #[error("installation cancelled")]
    Cancelled,
    #[error("extraction task failed: {0}")]
    Task(String),
}

impl InstallError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn http(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http { context, source }
    }

    pub(crate) fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }

    pub(crate) fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }

    /// The pipeline step the failure belongs to.
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Http { .. } | Self::HttpStatus { .. } => "download",
            Self::Zip { .. } | Self::Task(_) => "extract",
            Self::Io { .. } => "filesystem",
            Self::Busy { .. } => "locking",
            Self::Cancelled => "cancellation",
        }
    }
}

impl From<InstallError> for BackendError {
    fn from(error: InstallError) -> Self {
        match error {
            InstallError::Cancelled => BackendError::Cancelled {
                operation: "install",
            },
            other => BackendError::install_failed(other.phase(), other.to_string()),
        }
    }
}
