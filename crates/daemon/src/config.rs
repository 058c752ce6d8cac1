use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use logmirror_runtime::{LOG_EXTENSION, WorkerConfig, default_socket_path, default_worker_log_dir};

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub config_path: PathBuf,
    pub worker: WorkerConfig,
    // Unix domain socket publishers connect to
    pub socket_path: PathBuf,
    pub worker_log: Option<PathBuf>,
    pub once: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "logmirror-daemon",
    about = "Drain a subscription into an append-only message log"
)]
pub struct Cli {
    /// Path to the JSON worker config
    #[arg(long, short = 'c')]
    pub config: PathBuf,

    /// Path to Unix domain socket (optional override)
    #[arg(long)]
    pub socket_path: Option<PathBuf>,

    /// Run a single receive session and exit.
    #[arg(long)]
    pub once: bool,

    /// Log to stderr instead of the worker log file.
    #[arg(long)]
    pub log_stderr: bool,
}

/// `<worker_log_path>/<config file name>.log`
pub fn worker_log_path(worker: &WorkerConfig, config_path: &Path) -> PathBuf {
    let dir = worker
        .worker_log_path
        .clone()
        .unwrap_or_else(default_worker_log_dir);

    let name = config_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "worker".to_string());

    dir.join(format!("{name}.{LOG_EXTENSION}"))
}

impl DaemonConfig {
    pub fn from_args(args: &Cli) -> Result<Self> {
        let worker = WorkerConfig::load(&args.config)
            .with_context(|| format!("Failed to load config {}", args.config.display()))?;

        let socket_path = args.socket_path.clone().unwrap_or_else(default_socket_path);

        let worker_log = if args.log_stderr {
            None
        } else {
            Some(worker_log_path(&worker, &args.config))
        };

        Ok(Self {
            config_path: args.config.clone(),
            worker,
            socket_path,
            worker_log,
            once: args.once,
        })
    }

    pub fn from_env() -> Result<Self> {
        let args = Cli::parse();
        Self::from_args(&args)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
