use std::process::ExitCode;

use clap::Parser;

mod commands;

use commands::Command;
use logmirror_runtime::logging;

#[derive(Debug, Parser)]
#[command(
    name = "logmirror",
    version,
    about = "Publish to and inspect a logmirror worker"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Publish(args) => commands::publish::run(args),
        Command::Config(args) => commands::config::run(args),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
