use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use nodeswitch_backend::{
    BackendError, InstallPhase, InstallProgress, NodeVersion, VersionManager,
};
use nodeswitch_core::DEFAULT_INDEX_URL;
use nodeswitch_nvm::{InstallationRoot, NvmBackend, NvmSettings, locate_root};
use nodeswitch_platform::{AppPaths, SystemConfigStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::Command;
use crate::error::AppError;
use crate::settings::AppSettings;

pub struct App {
    settings: AppSettings,
    backend: NvmBackend,
    cancel: CancellationToken,
}

impl App {
    /// Resolve the installation root and wire up the backend.
    ///
    /// An explicit `root_override` wins over the `nvm_home` setting, which
    /// wins over locating the root.
    pub fn new(settings: AppSettings, root_override: Option<PathBuf>) -> Result<Self, AppError> {
        let root = match root_override.or_else(|| settings.nvm_home.clone()) {
            Some(path) => InstallationRoot::new(path),
            None => locate_root(&SystemConfigStore).map_err(BackendError::from)?,
        };
        let nvm = root.settings().ok();
        let index_url = resolve_index_url(&settings, nvm.as_ref());
        debug!(
            "Using root {} with index {index_url}",
            root.path().display()
        );

        let client = http_client(&settings, nvm.as_ref())?;
        let backend = NvmBackend::new(root, client, &index_url)
            .with_query_timeout(Duration::from_secs(settings.query_timeout_secs));

        Ok(Self {
            settings,
            backend,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts a running install when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one command. Installs watch the cancel token themselves so their
    /// cleanup runs; anything else is simply abandoned on cancellation.
    pub async fn run(&self, command: Command) -> Result<(), AppError> {
        if let Command::Install { version, activate } = command {
            return self
                .install(&version, activate || self.settings.activate_after_install)
                .await;
        }

        tokio::select! {
            result = self.dispatch(command) => result,
            () = self.cancel.cancelled() => Err(BackendError::Cancelled {
                operation: "command",
            }
            .into()),
        }
    }

    async fn dispatch(&self, command: Command) -> Result<(), AppError> {
        match command {
            Command::List => self.list().await,
            Command::Current { strict } => self.current(strict).await,
            Command::Available { limit } => self.available(limit).await,
            Command::Install { version, activate } => self.install(&version, activate).await,
            Command::Use { version } => self.use_version(&version).await,
            Command::Root => {
                self.root();
                Ok(())
            }
            Command::Config { write } => self.config(write),
        }
    }

    async fn list(&self) -> Result<(), AppError> {
        let installed = self.backend.list_installed().await?;
        if installed.is_empty() {
            println!(
                "No versions installed in {}",
                self.backend.root().path().display()
            );
            return Ok(());
        }

        for version in installed {
            let marker = if version.is_active { '*' } else { ' ' };
            let date = version
                .install_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            println!("{marker} {:<12} {date}", version.version.tag());
        }
        Ok(())
    }

    async fn current(&self, strict: bool) -> Result<(), AppError> {
        let current = if strict {
            self.backend.query_current().await?
        } else {
            self.backend.current_version().await
        };

        match current {
            Some(version) => println!("{version}"),
            None => info!("No active version"),
        }
        Ok(())
    }

    async fn available(&self, limit: Option<usize>) -> Result<(), AppError> {
        let remote = self.backend.list_remote().await?;
        let installed: HashSet<NodeVersion> = self
            .backend
            .list_installed()
            .await
            .map(|versions| versions.into_iter().map(|v| v.version).collect())
            .unwrap_or_default();

        for version in remote.iter().take(limit.unwrap_or(usize::MAX)) {
            if installed.contains(&version.version) {
                println!("{} (installed)", version.version);
            } else {
                println!("{}", version.version);
            }
        }
        Ok(())
    }

    async fn install(&self, version: &NodeVersion, activate: bool) -> Result<(), AppError> {
        if self.backend.is_installed(version).await? {
            println!("{version} is already installed");
        } else {
            let (tx, rx) = mpsc::channel(64);
            let printer = tokio::spawn(print_progress(*version, rx));
            let result = self.install_with_timeout(version, tx).await;
            let _ = printer.await;
            result?;
            println!("Installed {version}");
        }

        if activate {
            self.use_version(version).await?;
        }
        Ok(())
    }

    /// On timeout the install is cancelled and awaited, so its cleanup runs.
    async fn install_with_timeout(
        &self,
        version: &NodeVersion,
        progress: mpsc::Sender<InstallProgress>,
    ) -> Result<(), AppError> {
        let secs = self.settings.install_timeout_secs;
        let install = self
            .backend
            .install(version, Some(progress), self.cancel.clone());
        tokio::pin!(install);

        tokio::select! {
            result = &mut install => Ok(result?),
            () = tokio::time::sleep(Duration::from_secs(secs)) => {
                self.cancel.cancel();
                match install.await {
                    Ok(()) => Ok(()),
                    Err(BackendError::Cancelled { .. }) => Err(AppError::Timeout {
                        operation: "install",
                        secs,
                    }),
                    Err(error) => Err(error.into()),
                }
            }
        }
    }

    async fn use_version(&self, version: &NodeVersion) -> Result<(), AppError> {
        self.backend.use_version(version).await?;
        println!("Now using {version}");
        Ok(())
    }

    fn root(&self) {
        let info = self.backend.backend_info();
        println!("root:  {}", info.root.display());
        match &info.link_path {
            Some(link) => println!("link:  {}", link.display()),
            None => println!("link:  (not configured)"),
        }
        println!("index: {}", info.index_url);
    }

    fn config(&self, write: bool) -> Result<(), AppError> {
        let paths = AppPaths::new()?;
        println!("# {}", paths.settings_file().display());
        let json = serde_json::to_string_pretty(&self.settings).map_err(|error| AppError::Io {
            context: "failed to render settings",
            source: error.into(),
        })?;
        println!("{json}");

        if write {
            self.settings.save(&paths).map_err(|source| AppError::Io {
                context: "failed to save settings",
                source,
            })?;
            info!("Saved settings to {}", paths.settings_file().display());
        }
        Ok(())
    }
}

/// The `index_url` setting, then nvm's own `node_mirror`, then the default.
fn resolve_index_url(settings: &AppSettings, nvm: Option<&NvmSettings>) -> String {
    settings
        .index_url
        .clone()
        .or_else(|| nvm.and_then(|nvm| nvm.node_mirror.clone()))
        .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string())
}

/// Downloads go through nvm's configured proxy, if it names one.
fn http_client(
    settings: &AppSettings,
    nvm: Option<&NvmSettings>,
) -> Result<reqwest::Client, AppError> {
    let timeout = Duration::from_secs(settings.http_timeout_secs);
    let mut builder = reqwest::Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout);
    if let Some(proxy) = nvm.and_then(|nvm| nvm.proxy.as_deref()) {
        debug!("Routing downloads through proxy {proxy}");
        builder = builder.proxy(reqwest::Proxy::all(proxy).map_err(AppError::Client)?);
    }
    builder.build().map_err(AppError::Client)
}

async fn print_progress(version: NodeVersion, mut rx: mpsc::Receiver<InstallProgress>) {
    let mut last_percent = None;
    while let Some(event) = rx.recv().await {
        match event.phase {
            InstallPhase::Downloading => {
                if let Some(percent) = event.percent()
                    && last_percent != Some(percent)
                {
                    last_percent = Some(percent);
                    eprint!("\rDownloading {version}: {percent:>3}%");
                }
            }
            phase => {
                if last_percent.take().is_some() {
                    eprintln!();
                }
                eprintln!("{phase} {version}");
            }
        }
    }
    if last_percent.is_some() {
        eprintln!();
    }
}
