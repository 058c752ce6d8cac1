use log::{debug, warn};

use crate::{accumulator::BatchAccumulator, message::Message, sink::Sink};

/// What one flush did with the batch it drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records accepted by the sink's write call.
    pub written: usize,
    pub acked: usize,
    pub rejected: usize,
    /// The sink could not push its buffer to storage; everything written in
    /// this flush was rejected instead of acked.
    pub sink_flush_failed: bool,
}

/// Drain `batch` into `sink` and settle every drained message.
///
/// Records are written in batch order, then the sink is flushed (even when
/// some writes failed, and even for an empty batch), and only then are the
/// messages settled: a message is acked when its write succeeded and the
/// sink flush succeeded, otherwise it is rejected so the source redelivers
/// it. The batch is left empty with its threshold reserved.
///
/// Must run under the same guard as [`BatchAccumulator::append`].
pub fn flush<S: Sink + ?Sized>(batch: &mut BatchAccumulator, sink: &mut S) -> FlushReport {
    let pending = batch.take();

    let mut report = FlushReport::default();

    let results: Vec<(Message, bool)> = pending
        .into_iter()
        .map(|msg| match sink.write_record(msg.data()) {
            Ok(()) => {
                report.written += 1;
                (msg, true)
            }
            Err(e) => {
                warn!("Failed to write message ({} bytes) to sink: {e}", msg.len());
                (msg, false)
            }
        })
        .collect();

    if let Err(e) = sink.flush() {
        warn!(
            "Failed to flush sink; rejecting {} written messages: {e}",
            report.written
        );
        report.sink_flush_failed = true;
    }

    for (msg, written) in results {
        if written && !report.sink_flush_failed {
            msg.ack();
            report.acked += 1;
        } else {
            msg.nack();
            report.rejected += 1;
        }
    }

    debug!(
        "Flushed batch: written={}, acked={}, rejected={}",
        report.written, report.acked, report.rejected
    );

    report
}

#[cfg(test)]
#[path = "flush_tests.rs"]
mod tests;
