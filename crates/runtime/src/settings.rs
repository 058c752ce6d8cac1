//! Worker configuration, read once from a JSON file and immutable afterwards.
//!
//! ```json
//! {
//!   "project": "events-project",
//!   "subscription": "all-events",
//!   "keyfile": "/etc/logmirror/key.json",
//!   "worker": {
//!     "message_log_path": "/var/log/logmirror",
//!     "worker_log_path": "/var/log/logmirror/worker",
//!     "batch_size": 50,
//!     "max_wait_minutes": 10
//!   }
//! }
//! ```
//!
//! The older key spellings (`workerinfo`, `messagelogpath`, `workerlogpath`,
//! `batchsize`, `maxwaitmin`) are accepted as aliases.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_WAIT_MINUTES, LOG_EXTENSION};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {} is not valid worker JSON: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config is missing required field `{0}`")]
    Missing(&'static str),

    #[error("subscription `{0}` cannot be used as a log file name")]
    InvalidSubscription(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    keyfile: Option<PathBuf>,
    #[serde(default, alias = "workerinfo")]
    worker: RawWorker,
}

#[derive(Debug, Default, Deserialize)]
struct RawWorker {
    #[serde(default, alias = "messagelogpath")]
    message_log_path: Option<PathBuf>,
    #[serde(default, alias = "workerlogpath")]
    worker_log_path: Option<PathBuf>,
    #[serde(default, alias = "batchsize")]
    batch_size: Option<usize>,
    #[serde(default, alias = "maxwaitmin")]
    max_wait_minutes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub subscription: String,
    pub message_log_path: PathBuf,
    pub worker_log_path: Option<PathBuf>,
    pub batch_size: usize,
    pub max_wait_minutes: u64,
    /// Source connection parameters, carried for the source adapter only.
    pub project: Option<String>,
    pub topic: Option<String>,
    pub keyfile: Option<PathBuf>,
}

impl WorkerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let raw: RawConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_raw(raw)
    }

    /// Parse a config held in memory. Parse errors are reported against `<inline>`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json).map_err(|source| ConfigError::Malformed {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let subscription = raw
            .subscription
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("subscription"))?;
        if !is_plain_file_stem(&subscription) {
            return Err(ConfigError::InvalidSubscription(subscription));
        }

        let message_log_path = raw
            .worker
            .message_log_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::Missing("worker.message_log_path"))?;

        let batch_size = match raw.worker.batch_size {
            None | Some(0) => DEFAULT_BATCH_SIZE,
            Some(n) => n,
        };

        let max_wait_minutes = match raw.worker.max_wait_minutes {
            None | Some(0) => DEFAULT_MAX_WAIT_MINUTES,
            Some(n) => n,
        };

        Ok(Self {
            subscription,
            message_log_path,
            worker_log_path: raw.worker.worker_log_path,
            batch_size,
            max_wait_minutes,
            project: raw.project,
            topic: raw.topic,
            keyfile: raw.keyfile,
        })
    }

    /// `<message_log_path>/<subscription>.log`
    pub fn sink_path(&self) -> PathBuf {
        self.message_log_path
            .join(format!("{}.{LOG_EXTENSION}", self.subscription))
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_minutes.saturating_mul(60))
    }
}

/// The subscription names the log file, so it must stay a single path component.
fn is_plain_file_stem(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
