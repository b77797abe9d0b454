use std::sync::LazyLock;

use log::{debug, info};
use nodeswitch_backend::{NodeVersion, RemoteVersion};
use nodeswitch_platform::{PlatformError, SystemInfo};
use regex::Regex;

use crate::error::CatalogError;

pub const DEFAULT_INDEX_URL: &str = "https://nodejs.org/download/release/";

// Directory links in the index look like `<a href="v20.11.1/">v20.11.1/</a>`.
static INDEX_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']?(v\d+\.\d+\.\d+)/"#)
        .expect("index tag pattern should compile")
});

/// Scan release index text for version directory links, newest first,
/// without duplicates.
#[must_use]
pub fn parse_index_tags(html: &str) -> Vec<NodeVersion> {
    let mut versions: Vec<NodeVersion> = INDEX_TAG_PATTERN
        .captures_iter(html)
        .filter_map(|caps| NodeVersion::from_tag(&caps[1]))
        .collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions.dedup();
    versions
}

/// A release index bound to the platform whose archives it should point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseIndex {
    url: String,
    system: SystemInfo,
}

impl ReleaseIndex {
    #[must_use]
    pub fn new(url: &str, system: SystemInfo) -> Self {
        let url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{url}/")
        };
        Self { url, system }
    }

    /// Bind `url` to the running platform.
    ///
    /// # Errors
    /// Returns an error when the host OS or CPU has no published archives.
    pub fn for_host(url: &str) -> Result<Self, PlatformError> {
        Ok(Self::new(url, SystemInfo::detect()?))
    }

    #[must_use]
    pub fn archive_name(&self, version: &NodeVersion) -> String {
        format!(
            "node-{version}-{}-{}.zip",
            self.system.platform, self.system.arch
        )
    }

    #[must_use]
    pub fn download_url(&self, version: &NodeVersion) -> String {
        format!("{}{version}/{}", self.url, self.archive_name(version))
    }

    #[must_use]
    pub fn remote_versions(&self, html: &str) -> Vec<RemoteVersion> {
        parse_index_tags(html)
            .into_iter()
            .map(|version| RemoteVersion {
                download_url: self.download_url(&version),
                version,
            })
            .collect()
    }

    /// Fetch the index page and list every installable version.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unreadable body.
    pub async fn fetch_available(
        &self,
        client: &reqwest::Client,
    ) -> Result<Vec<RemoteVersion>, CatalogError> {
        debug!("Fetching release index from {}", self.url);

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(CatalogError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(CatalogError::HttpStatus {
                status,
                body_snippet,
            });
        }

        let html = response.text().await.map_err(CatalogError::Body)?;
        let versions = self.remote_versions(&html);
        info!("Release index lists {} versions", versions.len());
        Ok(versions)
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
