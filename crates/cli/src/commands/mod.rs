pub mod config;
pub mod publish;

use clap::Subcommand;
pub use config::ConfigArgs;
pub use publish::PublishArgs;

/// Common error type for command handlers
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish messages to a running worker and wait for them to be settled.
    ///
    /// Example:
    ///   logmirror publish '{"event":"login"}' '{"event":"logout"}'
    ///   cat app.jsonl | logmirror publish --timeout 60
    Publish(PublishArgs),

    /// Validate a worker config and print the resolved values.
    ///
    /// Example:
    ///   logmirror config /etc/logmirror/worker.json
    Config(ConfigArgs),
}
