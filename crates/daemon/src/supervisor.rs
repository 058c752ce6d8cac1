use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use log::{error, info};
use logmirror_core::{Error, FileSink, MessageSource, ReceiveContext, ReceiveSession, Result};
use logmirror_runtime::{WorkerConfig, bootstrap::ensure_message_log};

use crate::config::DaemonConfig;

/// Pause before opening a new session after one failed.
const RETRY_PAUSE: Duration = Duration::from_secs(3);

/// Run receive sessions back to back until `shutdown` is raised.
///
/// Each session gets a fresh sink handle and batch. The message log is
/// recreated before a session if it was rotated away. A failed session is
/// logged and retried after [`RETRY_PAUSE`]; with `once` set, the first
/// session's result is returned instead.
pub fn run<M>(config: &DaemonConfig, source: &M, shutdown: Arc<AtomicBool>) -> anyhow::Result<()>
where
    M: MessageSource + ?Sized,
{
    let worker = &config.worker;
    let mut sessions: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        sessions += 1;
        let ctx = ReceiveContext::with_cancel_flag(worker.max_wait(), Arc::clone(&shutdown));

        let outcome = open_session(worker).and_then(|session| session.run(source, &ctx));

        match outcome {
            Ok(report) => {
                info!(
                    "Session {sessions} on {} finished: received={}, acked={}, rejected={}",
                    source.subscription(),
                    report.received,
                    report.acked,
                    report.rejected
                );
            }
            Err(err) if config.once => return Err(err.into()),
            Err(err) => {
                error!("Session {sessions} on {} failed: {err}", source.subscription());
                pause(RETRY_PAUSE, &shutdown);
            }
        }

        if config.once {
            break;
        }
    }

    info!("Worker shutdown complete after {sessions} sessions.");
    Ok(())
}

fn open_session(worker: &WorkerConfig) -> Result<ReceiveSession<FileSink>> {
    ensure_message_log(worker).map_err(|source| Error::SinkUnopenable {
        path: worker.sink_path(),
        source,
    })?;
    ReceiveSession::open(worker)
}

/// Sleep for `duration`, waking early if shutdown is requested.
fn pause(duration: Duration, shutdown: &AtomicBool) {
    let until = Instant::now() + duration;
    while !shutdown.load(Ordering::Relaxed) {
        let left = until.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        thread::sleep(left.min(Duration::from_millis(100)));
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
