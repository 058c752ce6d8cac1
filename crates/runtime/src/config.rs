use std::path::PathBuf;

pub const PROGRAM_NAME: &str = "logmirror";
pub const PROGRAM_LOG_LEVEL: &str = "LOGMIRROR_LOG_LEVEL";

/// Messages allowed to sit in a batch before the next append forces a flush.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Wall-clock length of one receive session.
pub const DEFAULT_MAX_WAIT_MINUTES: u64 = 10;

pub const SOCKET_FILE_NAME: &str = "publish.sock";

/// Extension of both the message log and the worker log.
pub const LOG_EXTENSION: &str = "log";

pub fn xdg_or_home(xdg_var: &str, home_suffix: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(xdg_var) {
        PathBuf::from(dir)
    } else {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_suffix)
    }
}

pub fn program_dir() -> PathBuf {
    xdg_or_home("XDG_CACHE_HOME", ".cache").join(PROGRAM_NAME)
}

/// Default Unix socket the worker accepts publishers on.
pub fn default_socket_path() -> PathBuf {
    program_dir().join(SOCKET_FILE_NAME)
}

/// Directory for the worker's own log when the config does not name one.
pub fn default_worker_log_dir() -> PathBuf {
    // Check XDG_STATE_HOME first (Linux)
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME")
        && !xdg_state.is_empty()
    {
        return PathBuf::from(xdg_state).join(PROGRAM_NAME);
    }

    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join(PROGRAM_NAME))
        .unwrap_or_else(std::env::temp_dir)
}
