use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Mutex, OnceLock},
};

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::PROGRAM_LOG_LEVEL;

enum LogTarget {
    Stderr,
    /// One handle shared by every thread that logs; the mutex keeps lines whole.
    File(Mutex<File>),
}

/// Process-wide logger. Installed once through [`init`] or [`init_with_file`]
/// and then reached only through the `log` macros, so concurrent writers
/// never hold their own copy of the output handle.
pub struct Logger {
    level: Level,
    target: LogTarget,
}

impl Logger {
    fn format(record: &Record<'_>) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "{} {} [{}] {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let msg = Self::format(record);

            match &self.target {
                LogTarget::Stderr => {
                    eprintln!("{msg}")
                }
                LogTarget::File(file) => {
                    let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
                    // Nowhere left to report a failing log write.
                    let _ = writeln!(file, "{msg}");
                }
            }
        }
    }

    fn flush(&self) {
        if let LogTarget::File(file) = &self.target {
            let _ = file.lock().unwrap_or_else(|e| e.into_inner()).flush();
        }
    }
}

fn get_level_from_env() -> Level {
    std::env::var(PROGRAM_LOG_LEVEL)
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .and_then(|filter| filter.to_level())
        .unwrap_or(Level::Info)
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Log to stderr.
pub fn init() -> Result<(), SetLoggerError> {
    _init(get_level_from_env(), LogTarget::Stderr)
}

/// Log to the worker log file at `path`, falling back to stderr if it
/// cannot be opened.
pub fn init_with_file(path: &Path) -> Result<(), SetLoggerError> {
    match open_log_file(path) {
        Ok(file) => _init(get_level_from_env(), LogTarget::File(Mutex::new(file))),
        Err(e) => {
            eprintln!(
                "failed to open worker log {}: {e}; logging to stderr",
                path.display()
            );
            init()
        }
    }
}

fn _init(level: Level, target: LogTarget) -> Result<(), SetLoggerError> {
    static LOGGER: OnceLock<Logger> = OnceLock::new();

    // Only the first call installs anything; later targets are discarded so
    // the level seen by `set_max_level` always matches the stored logger.
    let init_call = LOGGER.get().is_none();

    let logger = LOGGER.get_or_init(|| Logger { level, target });

    if init_call {
        log::set_logger(logger)?;
        log::set_max_level(logger.level.to_level_filter());
    }

    Ok(())
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
