use std::sync::{Arc, atomic::AtomicBool};

mod config;
mod source;
mod supervisor;

use anyhow::Context;
use config::DaemonConfig;
use logmirror_runtime::{bootstrap, logging};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use source::SocketSource;

use log::info;

fn main() -> anyhow::Result<()> {
    let config = DaemonConfig::from_env()?;

    match &config.worker_log {
        Some(path) => logging::init_with_file(path).ok(),
        None => logging::init().ok(),
    };

    info!(
        "Starting logmirror worker: config={}, subscription={}, log={}, socket={}",
        config.config_path.display(),
        config.worker.subscription,
        config.worker.sink_path().display(),
        config.socket_path.display(),
    );

    bootstrap::ensure_message_log(&config.worker).with_context(|| {
        format!(
            "Unable to create message log under {}",
            config.worker.message_log_path.display()
        )
    })?;

    let shutdown = Arc::new(AtomicBool::new(false));

    // Register signal handlers. They only set the atomic flag
    for sig in [SIGINT, SIGTERM] {
        flag::register(sig, Arc::clone(&shutdown))
            .with_context(|| format!("Failed to register signal handler for {sig}"))?;
    }

    let source = SocketSource::bind(config.worker.subscription.clone(), &config.socket_path)?;

    supervisor::run(&config, &source, shutdown)
}
