mod app;
mod cli;
mod error;
mod logging;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, warn};

use crate::app::App;
use crate::cli::Cli;
use crate::error::AppError;
use crate::logging::LogOptions;
use crate::settings::AppSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = AppSettings::load();
    logging::init_logging(LogOptions {
        verbose: cli.verbose,
        debug_file: settings.debug_logging,
        max_log_size: settings.max_log_size_bytes,
    });
    debug!("nodeswitch {} starting: {:?}", env!("CARGO_PKG_VERSION"), cli.command);

    let app = match App::new(settings, cli.root) {
        Ok(app) => app,
        Err(error) => return report(&error),
    };

    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    match app.run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(&error),
    }
}

fn report(error: &AppError) -> ExitCode {
    error!("{error}");
    eprintln!("error: {error}");
    if let Some(hint) = error.hint() {
        eprintln!("hint: {hint}");
    }
    ExitCode::from(error.exit_code())
}
