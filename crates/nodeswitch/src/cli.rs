use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nodeswitch_backend::NodeVersion;

/// Install Node.js releases and switch the active one.
#[derive(Debug, Parser)]
#[command(
    name = "nodeswitch",
    version,
    after_help = "\
ROOT RESOLUTION:
    1. --root, or nvm_home in settings.json
    2. NVM_HOME environment variable
    3. nvm's InstallLocation in the registry (Windows)
    4. Default locations, then the directory holding the nvm executable"
)]
pub struct Cli {
    /// Log debug output for this run.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Installation root to use instead of locating one.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List installed versions, newest first.
    List,

    /// Print the active version.
    Current {
        /// Fail instead of printing nothing when detection breaks.
        #[arg(long)]
        strict: bool,
    },

    /// List versions available from the release index.
    Available {
        /// Show at most this many versions.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Download and install a version.
    Install {
        version: NodeVersion,

        /// Switch to the version once installed.
        #[arg(long = "use")]
        activate: bool,
    },

    /// Make an installed version the active one.
    Use { version: NodeVersion },

    /// Print the installation root and the active version link.
    Root,

    /// Print the effective settings and where they are stored.
    Config {
        /// Write the effective settings back to disk.
        #[arg(long)]
        write: bool,
    },
}
