use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

use nodeswitch_platform::{AppPaths, create_parent};

/// Where one run's log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    /// `--verbose`: echo debug output to stderr as well.
    pub verbose: bool,
    /// `debug_logging` setting: keep debug output in the log file.
    pub debug_file: bool,
    /// A log larger than this is set aside before the run starts.
    pub max_log_size: u64,
}

impl LogOptions {
    fn file_level(self) -> LevelFilter {
        if self.verbose || self.debug_file {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }

    /// Errors reach the user through the command's own output, so stderr
    /// only carries log lines on request.
    fn term_level(self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Off
        }
    }
}

pub fn init_logging(options: LogOptions) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if options.term_level() != LevelFilter::Off {
        loggers.push(TermLogger::new(
            options.term_level(),
            term_config(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }

    let log_path = AppPaths::new()
        .ok()
        .map(|paths| paths.log_file().to_path_buf());
    if let Some(path) = &log_path {
        match open_log(path, options.max_log_size) {
            Ok(file) => loggers.push(WriteLogger::new(options.file_level(), file_config(), file)),
            Err(error) if options.verbose => {
                eprintln!("log file {} unavailable: {error}", path.display());
            }
            Err(_) => {}
        }
    }

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }

    if let Some(path) = &log_path {
        log::debug!("Logging to {}", path.display());
    }
}

fn file_config() -> Config {
    ConfigBuilder::new()
        .add_filter_allow_str("nodeswitch")
        .set_time_format_rfc3339()
        .build()
}

fn term_config() -> Config {
    ConfigBuilder::new()
        .add_filter_allow_str("nodeswitch")
        .set_time_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build()
}

/// Open the log for appending. An oversized log is first moved to
/// `<name>.old`, replacing the previous one.
fn open_log(path: &Path, max_size: u64) -> io::Result<File> {
    create_parent(path)?;
    if std::fs::metadata(path).is_ok_and(|metadata| metadata.len() > max_size) {
        std::fs::rename(path, rotated_path(path))?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".old");
    path.with_file_name(name)
}
