//! One bounded run of a subscription into the message log.
//!
//! A [`ReceiveSession`] owns the pending batch and the sink behind a single
//! mutex. Every delivery takes that guard, appends, and flushes in place once
//! the batch has grown past its threshold, so a slow sink throttles intake.
//! When the source's receive loop returns, whatever is still pending is
//! rejected for redelivery and the sink is dropped, closing the log handle.

use std::sync::{Mutex, MutexGuard};

use log::{error, info, warn};
use logmirror_runtime::WorkerConfig;

use crate::{
    accumulator::BatchAccumulator,
    context::ReceiveContext,
    error::{Error, Result, SourceError},
    flush::{FlushReport, flush},
    message::Message,
    sink::{FileSink, Sink},
    source::MessageSource,
};

/// Counters for one finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub received: usize,
    pub flushes: usize,
    pub acked: usize,
    pub rejected: usize,
    /// Still pending when the receive loop stopped; rejected at close.
    pub abandoned: usize,
}

impl SessionReport {
    fn record(&mut self, flush: &FlushReport) {
        self.flushes += 1;
        self.acked += flush.acked;
        self.rejected += flush.rejected;
    }
}

struct Pending<S> {
    batch: BatchAccumulator,
    sink: S,
    report: SessionReport,
}

pub struct ReceiveSession<S: Sink> {
    subscription: String,
    state: Mutex<Pending<S>>,
}

impl ReceiveSession<FileSink> {
    /// Open the configured message log in append mode. The file must exist.
    pub fn open(config: &WorkerConfig) -> Result<Self> {
        let path = config.sink_path();
        let sink = FileSink::open(&path).map_err(|source| Error::SinkUnopenable {
            path: path.clone(),
            source,
        })?;

        info!("Opened message log {}", path.display());
        Ok(Self::with_sink(
            config.subscription.clone(),
            config.batch_size,
            sink,
        ))
    }
}

impl<S: Sink> ReceiveSession<S> {
    pub fn with_sink(subscription: impl Into<String>, threshold: usize, sink: S) -> Self {
        Self {
            subscription: subscription.into(),
            state: Mutex::new(Pending {
                batch: BatchAccumulator::new(threshold),
                sink,
                report: SessionReport::default(),
            }),
        }
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    fn lock(&self) -> MutexGuard<'_, Pending<S>> {
        // A panic mid-flush leaves the batch either untouched or already
        // taken, so the state is still coherent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Route one delivery into the batch; flushes when it grows past the
    /// threshold. Returns the batch size once the guard is released.
    pub fn handle(&self, msg: Message) -> usize {
        let mut guard = self.lock();
        let pending = &mut *guard;

        pending.report.received += 1;
        pending.batch.append(msg);

        if pending.batch.should_flush() {
            let flushed = flush(&mut pending.batch, &mut pending.sink);
            pending.report.record(&flushed);
        }

        pending.batch.len()
    }

    /// Messages currently waiting for a flush.
    pub fn pending(&self) -> usize {
        self.lock().batch.len()
    }

    /// Receive from `source` until `ctx` is done, then close the session.
    ///
    /// Consumes the session: the sink is dropped before this returns on
    /// every path.
    pub fn run<M>(self, source: &M, ctx: &ReceiveContext) -> Result<SessionReport>
    where
        M: MessageSource + ?Sized,
    {
        info!("[{}] Starting receiver", self.subscription);

        let received = source.receive(ctx, &|msg: Message| {
            self.handle(msg);
        });

        let report = self.close();

        match received {
            Ok(()) => {
                info!(
                    "[{}] Closing receiver: received={}, flushes={}, acked={}, rejected={}, abandoned={}",
                    self.subscription,
                    report.received,
                    report.flushes,
                    report.acked,
                    report.rejected,
                    report.abandoned
                );
                Ok(report)
            }
            Err(SourceError::Unavailable(msg)) => {
                error!("[{}] Subscription unavailable: {msg}", self.subscription);
                Err(Error::SubscriptionUnavailable {
                    subscription: self.subscription,
                    source: SourceError::Unavailable(msg),
                })
            }
            Err(source) => {
                error!("[{}] Receive failed: {source}", self.subscription);
                Err(Error::ReceiveFailed {
                    subscription: self.subscription,
                    source,
                })
            }
        }
    }

    /// Reject anything still pending and release the sink.
    fn close(&self) -> SessionReport {
        let mut guard = self.lock();
        let pending = &mut *guard;

        let abandoned = pending.batch.take();
        if !abandoned.is_empty() {
            warn!(
                "[{}] Rejecting {} unflushed messages at session end",
                self.subscription,
                abandoned.len()
            );
        }
        pending.report.abandoned = abandoned.len();
        pending.report.rejected += abandoned.len();
        abandoned.into_iter().for_each(Message::nack);

        if let Err(e) = pending.sink.flush() {
            warn!("[{}] Final sink flush failed: {e}", self.subscription);
        }

        pending.report
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
