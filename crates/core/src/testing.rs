//! Test doubles shared by the unit tests in this crate.

use std::{
    collections::HashSet,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    message::{Message, Outcome},
    sink::Sink,
};

/// Records every settlement, in order, as `(payload, outcome)`.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Arc<Mutex<Vec<(String, Outcome)>>>,
}

impl Ledger {
    pub fn message(&self, payload: &str) -> Message {
        let entries = Arc::clone(&self.entries);
        let key = payload.to_string();
        Message::new(payload, move |outcome: Outcome| {
            entries.lock().unwrap().push((key, outcome));
        })
    }

    pub fn entries(&self) -> Vec<(String, Outcome)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries()
            .iter()
            .filter(|(_, o)| *o == outcome)
            .count()
    }

    pub fn outcomes_for(&self, payload: &str) -> Vec<Outcome> {
        self.entries()
            .into_iter()
            .filter(|(p, _)| p == payload)
            .map(|(_, o)| o)
            .collect()
    }
}

/// Observable state of a [`MemorySink`], kept after the sink is dropped.
#[derive(Debug, Default)]
pub struct SinkProbe {
    pub buffered: Mutex<Vec<u8>>,
    pub stored: Mutex<Vec<u8>>,
    pub flushes: AtomicUsize,
    pub drops: AtomicUsize,
}

impl SinkProbe {
    pub fn stored_lines(&self) -> Vec<String> {
        String::from_utf8(self.stored.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// In-memory sink whose writes can be made to fail per payload.
pub struct MemorySink {
    probe: Arc<SinkProbe>,
    fail_payloads: HashSet<Vec<u8>>,
    fail_flush: bool,
}

impl MemorySink {
    pub fn new() -> (Self, Arc<SinkProbe>) {
        let probe = Arc::new(SinkProbe::default());
        let sink = Self {
            probe: Arc::clone(&probe),
            fail_payloads: HashSet::new(),
            fail_flush: false,
        };
        (sink, probe)
    }

    pub fn failing_on(mut self, payload: &str) -> Self {
        self.fail_payloads.insert(payload.as_bytes().to_vec());
        self
    }

    pub fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }
}

impl Sink for MemorySink {
    fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        if self.fail_payloads.contains(payload) {
            return Err(io::Error::other("simulated write failure"));
        }
        let mut buf = self.probe.buffered.lock().unwrap();
        buf.extend_from_slice(payload);
        buf.push(b'\n');
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.probe.flushes.fetch_add(1, Ordering::SeqCst);
        if self.fail_flush {
            return Err(io::Error::other("simulated flush failure"));
        }
        let mut buf = self.probe.buffered.lock().unwrap();
        self.probe.stored.lock().unwrap().append(&mut buf);
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.probe.drops.fetch_add(1, Ordering::SeqCst);
    }
}
