pub mod bootstrap;
mod config;
pub mod logging;
pub mod settings;

pub use config::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_WAIT_MINUTES, LOG_EXTENSION, PROGRAM_NAME,
    default_socket_path, default_worker_log_dir, program_dir,
};

pub use logging::init;
pub use settings::{ConfigError, WorkerConfig};
