use std::{path::PathBuf, process::ExitCode};

use clap::Args;
use log::error;
use logmirror_runtime::WorkerConfig;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Path to the JSON worker config
    pub path: PathBuf,
}

pub fn run(args: ConfigArgs) -> ExitCode {
    match WorkerConfig::load(&args.path) {
        Ok(cfg) => {
            print!("{}", describe(&cfg));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[error] {e}");
            eprintln!("[config] {e}");
            ExitCode::from(2)
        }
    }
}

fn describe(cfg: &WorkerConfig) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| {
        out.push_str(&format!("{key:<14}{value}\n"));
    };

    line("subscription", cfg.subscription.clone());
    line("message log", cfg.sink_path().display().to_string());
    line("batch size", cfg.batch_size.to_string());
    line("max wait", format!("{} min", cfg.max_wait_minutes));
    if let Some(dir) = &cfg.worker_log_path {
        line("worker log", dir.display().to_string());
    }
    if let Some(project) = &cfg.project {
        line("project", project.clone());
    }
    out
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
