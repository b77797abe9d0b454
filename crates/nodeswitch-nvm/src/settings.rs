use std::path::{Path, PathBuf};

/// Values read from nvm's `settings.txt`, one `key: value` pair per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NvmSettings {
    /// Where the active version's directory link lives.
    pub path: Option<PathBuf>,
    /// Proxy for downloads; `none` in the file leaves it unset.
    pub proxy: Option<String>,
    pub node_mirror: Option<String>,
}

impl NvmSettings {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut settings = Self::default();

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim().to_ascii_lowercase().as_str() {
                "path" => settings.path = Some(link_location(value)),
                "proxy" if !value.eq_ignore_ascii_case("none") => {
                    settings.proxy = Some(value.to_string());
                }
                "node_mirror" => settings.node_mirror = Some(value.to_string()),
                _ => {}
            }
        }

        settings
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    /// Returns the I/O error when the file cannot be read.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(|text| Self::parse(&text))
    }
}

/// A trailing separator would make the link location resolve through the
/// link itself, so it is dropped unless the value is a bare filesystem root.
fn link_location(value: &str) -> PathBuf {
    let trimmed = value.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() || trimmed.ends_with(':') {
        PathBuf::from(value)
    } else {
        PathBuf::from(trimmed)
    }
}
