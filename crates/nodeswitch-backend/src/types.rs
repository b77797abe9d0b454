use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static TRIPLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v?(\d+)\.(\d+)\.(\d+)").expect("version triple pattern should compile")
});

/// A Node.js release identity. Equality and ordering only ever look at the
/// numeric triple, so `v5.2.0` and `5.2.0` are the same version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl NodeVersion {
    pub const UNKNOWN: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first `MAJOR.MINOR.PATCH` triple found anywhere in `text`.
    ///
    /// Never fails: text without a triple (or with components that overflow
    /// `u32`) yields [`NodeVersion::UNKNOWN`].
    #[must_use]
    pub fn parse_lenient(text: &str) -> Self {
        TRIPLE_PATTERN
            .captures(text)
            .and_then(|caps| {
                let major = caps[1].parse().ok()?;
                let minor = caps[2].parse().ok()?;
                let patch = caps[3].parse().ok()?;
                Some(Self::new(major, minor, patch))
            })
            .unwrap_or(Self::UNKNOWN)
    }

    /// Parse a directory-style tag. Only the canonical `vX.Y.Z` spelling is
    /// accepted, so the tag a version prints always names its directory.
    #[must_use]
    pub fn from_tag(name: &str) -> Option<Self> {
        let version: Self = name.strip_prefix('v')?.parse().ok()?;
        (version.tag() == name).then_some(version)
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    #[must_use]
    pub fn tag(&self) -> String {
        self.to_string()
    }
}

impl Ord for NodeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
    }
}

impl PartialOrd for NodeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y.Z format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} version: {value}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
    },
}

impl FromStr for NodeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);

        let invalid = || VersionParseError::InvalidFormat {
            input: s.to_string(),
        };

        let mut parts = s.split('.');
        let major_str = parts.next().ok_or_else(invalid)?;
        let minor_str = parts.next().ok_or_else(invalid)?;
        let patch_str = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let component = |component: VersionComponent, value: &str| {
            value
                .parse::<u32>()
                .map_err(|_| VersionParseError::InvalidComponent {
                    component,
                    value: value.to_string(),
                })
        };

        Ok(NodeVersion::new(
            component(VersionComponent::Major, major_str)?,
            component(VersionComponent::Minor, minor_str)?,
            component(VersionComponent::Patch, patch_str)?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersion {
    pub version: NodeVersion,
    pub path: PathBuf,
    pub is_active: bool,
    pub install_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVersion {
    pub version: NodeVersion,
    pub download_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Downloading,
    Extracting,
    Finalizing,
    Complete,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloading => write!(f, "downloading"),
            Self::Extracting => write!(f, "extracting"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallProgress {
    pub phase: InstallPhase,
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl InstallProgress {
    #[must_use]
    pub fn downloading(downloaded: u64, total: u64) -> Self {
        Self {
            phase: InstallPhase::Downloading,
            downloaded,
            total: Some(total),
        }
    }

    #[must_use]
    pub fn phase(phase: InstallPhase) -> Self {
        Self {
            phase,
            downloaded: 0,
            total: None,
        }
    }

    /// Download percentage, or `None` when the total size is unknown.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        let total = self.total.filter(|total| *total > 0)?;
        let percent = self.downloaded.saturating_mul(100) / total;
        Some(u8::try_from(percent.min(100)).unwrap_or(100))
    }
}
