use std::mem;

use crate::message::Message;

/// Pending messages in receive order.
///
/// `threshold` is a policy, not a capacity: appends always succeed, and the
/// owner flushes once [`should_flush`](Self::should_flush) reports the batch
/// has grown past it. Callers reach the accumulator only through the
/// session's guard, which `&mut self` enforces.
#[derive(Debug)]
pub struct BatchAccumulator {
    messages: Vec<Message>,
    threshold: usize,
}

impl BatchAccumulator {
    pub fn new(threshold: usize) -> Self {
        Self {
            messages: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Returns the batch size after the append.
    pub fn append(&mut self, msg: Message) -> usize {
        self.messages.push(msg);
        self.messages.len()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Strictly greater: a threshold of N lets N messages wait.
    pub fn should_flush(&self) -> bool {
        self.messages.len() > self.threshold
    }

    /// Hand over every pending message and start a fresh batch with the
    /// threshold reserved again.
    pub fn take(&mut self) -> Vec<Message> {
        mem::replace(&mut self.messages, Vec::with_capacity(self.threshold))
    }

    pub fn capacity(&self) -> usize {
        self.messages.capacity()
    }
}

#[cfg(test)]
#[path = "accumulator_tests.rs"]
mod tests;
