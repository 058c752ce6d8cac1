use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
};

use log::info;

use crate::settings::WorkerConfig;

/// Make sure the message log for `config` exists, creating its directory
/// and an empty file when needed. Existing content is never touched.
pub fn ensure_message_log(config: &WorkerConfig) -> io::Result<PathBuf> {
    fs::create_dir_all(&config.message_log_path)?;

    let path = config.sink_path();
    if !path.exists() {
        OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Created message log {}", path.display());
    }

    Ok(path)
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
