use nodeswitch_backend::BackendError;
use nodeswitch_platform::AppPathsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{operation} did not finish within {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
}

impl AppError {
    /// Process exit code: 2 for setup problems, 130 for cancellation, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Backend(
                BackendError::InstallationNotFound { .. } | BackendError::ConfigurationMissing { .. },
            )
            | Self::Paths(_) => 2,
            Self::Backend(BackendError::Cancelled { .. }) => 130,
            _ => 1,
        }
    }

    /// Extra guidance printed under the error, when there is any.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Backend(error) if error.is_permission_denied() => Some(
                "Creating directory links needs elevated rights or Developer Mode on Windows.",
            ),
            Self::Backend(BackendError::InstallationNotFound { .. }) => {
                Some("Set NVM_HOME or pass --root to point at the installation root.")
            }
            Self::Backend(BackendError::ConfigurationMissing { .. }) => {
                Some("settings.txt needs a `path:` line naming the active version link.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn setup_errors_exit_with_two() {
        let error = AppError::from(BackendError::InstallationNotFound {
            searched: "/nowhere".to_string(),
        });

        assert_eq!(error.exit_code(), 2);
        assert!(error.hint().is_some());
    }

    #[test]
    fn cancellation_exits_with_130() {
        let error = AppError::from(BackendError::Cancelled {
            operation: "install",
        });

        assert_eq!(error.exit_code(), 130);
        assert!(error.hint().is_none());
    }

    #[test]
    fn permission_denied_switch_has_hint() {
        let error = AppError::from(BackendError::Switch {
            version: "v20.11.1".to_string(),
            kind: std::io::ErrorKind::Other,
            details: "A required privilege is not held by the client. (os error 1314)".to_string(),
        });

        assert_eq!(error.exit_code(), 1);
        assert!(error.hint().is_some_and(|hint| hint.contains("Developer Mode")));
    }

    #[test]
    fn configuration_missing_display_names_file() {
        let error = AppError::from(BackendError::ConfigurationMissing {
            path: PathBuf::from("/nvm/settings.txt"),
            details: "no `path:` entry".to_string(),
        });

        assert_eq!(
            error.to_string(),
            "Configuration missing in /nvm/settings.txt: no `path:` entry"
        );
    }
}
