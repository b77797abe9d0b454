use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Unsupported platform ({os}) or architecture ({arch})")]
    Unsupported { os: String, arch: String },
}

/// Operating system as named in Node.js release archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    Darwin,
}

impl Platform {
    #[must_use]
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Darwin),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "win",
            Self::Linux => "linux",
            Self::Darwin => "darwin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture as named in Node.js release archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    Arm64,
    X86,
}

impl Arch {
    #[must_use]
    pub fn from_target(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" => Some(Self::X64),
            "aarch64" => Some(Self::Arm64),
            "x86" => Some(Self::X86),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
            Self::X86 => "x86",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemInfo {
    pub platform: Platform,
    pub arch: Arch,
}

impl SystemInfo {
    /// Detect the platform and architecture this binary runs on.
    ///
    /// # Errors
    /// Returns [`PlatformError::Unsupported`] when either is not one Node.js
    /// publishes archives for.
    pub fn detect() -> Result<Self, PlatformError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build from `std::env::consts`-style names.
    ///
    /// # Errors
    /// Returns [`PlatformError::Unsupported`] for unknown names.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, PlatformError> {
        match (Platform::from_os(os), Arch::from_target(arch)) {
            (Some(platform), Some(arch)) => Ok(Self { platform, arch }),
            _ => Err(PlatformError::Unsupported {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }
}
