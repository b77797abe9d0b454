//! Network and archive side of nodeswitch.
//!
//! This crate knows nothing about where versions are activated; it only
//! produces installed version directories:
//! - Release index fetching and download URL synthesis.
//! - Streaming archive download with progress reporting.
//! - Zip extraction and wrapper-directory flattening.

mod archive;
mod catalog;
mod error;
mod install;

/// Local HTTP server used by this workspace's download tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_server;

/// Zip extraction and layout normalization helpers.
pub use archive::{extract_zip, flatten_wrapper};
/// Release index model, parser and fetcher.
pub use catalog::{DEFAULT_INDEX_URL, ReleaseIndex, parse_index_tags};
/// Error types for catalog and install failures.
pub use error::{CatalogError, InstallError};
/// Download & install pipeline.
pub use install::Installer;
