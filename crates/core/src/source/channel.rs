use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::debug;

use crate::{
    context::ReceiveContext,
    error::SourceError,
    message::{Message, Outcome},
    source::{Handler, MessageSource},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Envelope {
    data: Vec<u8>,
    attempt: u32,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    acked: AtomicU64,
    redelivered: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub published: u64,
    pub acked: u64,
    pub redelivered: u64,
}

/// In-process subscription backed by a crossbeam channel.
///
/// Delivery fans out over `workers` threads, so the handler sees concurrent
/// calls the way it would from a networked pub/sub client. A nacked message
/// goes back on the queue.
pub struct ChannelSource {
    subscription: String,
    workers: usize,
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
    counters: Arc<Counters>,
    receiving: AtomicBool,
}

/// Cloneable handle for publishing into a [`ChannelSource`].
#[derive(Clone)]
pub struct Publisher {
    tx: Sender<Envelope>,
    counters: Arc<Counters>,
}

impl Publisher {
    pub fn publish(&self, data: impl Into<Vec<u8>>) {
        self.counters.published.fetch_add(1, Ordering::Relaxed);
        // The source holds a receiver for as long as publishers can exist.
        let _ = self.tx.send(Envelope {
            data: data.into(),
            attempt: 1,
        });
    }
}

impl ChannelSource {
    pub fn new(subscription: impl Into<String>, workers: usize) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            subscription: subscription.into(),
            workers: workers.max(1),
            tx,
            rx,
            counters: Arc::new(Counters::default()),
            receiving: AtomicBool::new(false),
        }
    }

    pub fn publisher(&self) -> Publisher {
        Publisher {
            tx: self.tx.clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Messages queued and not currently out for delivery.
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            published: self.counters.published.load(Ordering::Relaxed),
            acked: self.counters.acked.load(Ordering::Relaxed),
            redelivered: self.counters.redelivered.load(Ordering::Relaxed),
        }
    }

    fn deliver(&self, envelope: Envelope) -> Message {
        let requeue = self.tx.clone();
        let counters = Arc::clone(&self.counters);
        let attempt = envelope.attempt;
        let data = envelope.data.clone();

        Message::new(envelope.data, move |outcome: Outcome| match outcome {
            Outcome::Ack => {
                counters.acked.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Nack => {
                counters.redelivered.fetch_add(1, Ordering::Relaxed);
                let _ = requeue.send(Envelope {
                    data,
                    attempt: attempt + 1,
                });
            }
        })
    }

    fn worker_loop(&self, ctx: &ReceiveContext, handler: &Handler<'_>) {
        while !ctx.is_done() {
            match self.rx.recv_timeout(POLL_INTERVAL.min(ctx.remaining())) {
                Ok(envelope) => {
                    if envelope.attempt > 1 {
                        debug!(
                            "[{}] redelivering message, attempt {}",
                            self.subscription, envelope.attempt
                        );
                    }
                    handler(self.deliver(envelope));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

impl MessageSource for ChannelSource {
    fn subscription(&self) -> &str {
        &self.subscription
    }

    fn receive(&self, ctx: &ReceiveContext, handler: &Handler<'_>) -> Result<(), SourceError> {
        if self.receiving.swap(true, Ordering::AcqRel) {
            return Err(SourceError::Unavailable(format!(
                "{} already has an active receiver",
                self.subscription
            )));
        }

        debug!(
            "[{}] receiving with {} workers",
            self.subscription, self.workers
        );

        thread::scope(|s| {
            for _ in 0..self.workers {
                s.spawn(|| self.worker_loop(ctx, handler));
            }
        });

        self.receiving.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
