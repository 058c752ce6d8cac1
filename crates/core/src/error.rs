use std::{io, path::PathBuf};

use logmirror_runtime::ConfigError;
use thiserror::Error;

/// Failures reported by a [`MessageSource`](crate::MessageSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The subscription could not be established at all.
    #[error("subscription unavailable: {0}")]
    Unavailable(String),

    /// The receive loop failed after it started.
    #[error("receive failed: {0}")]
    Receive(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors surfaced to whoever constructs and runs a session.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("subscription {subscription} is unavailable: {source}")]
    SubscriptionUnavailable {
        subscription: String,
        #[source]
        source: SourceError,
    },

    #[error("unable to open message log {}: {source}", .path.display())]
    SinkUnopenable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to receive messages on {subscription}: {source}")]
    ReceiveFailed {
        subscription: String,
        #[source]
        source: SourceError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
