use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

// Stand-in deadline for timeouts that overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Bounds a receive call: done once the deadline passes or the shared flag
/// is raised, whichever comes first.
///
/// Clones share the flag, so cancelling any clone stops them all. The flag
/// can also be handed to `signal_hook::flag::register`.
#[derive(Debug, Clone)]
pub struct ReceiveContext {
    deadline: Instant,
    cancelled: Arc<AtomicBool>,
}

impl ReceiveContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_cancel_flag(timeout, Arc::new(AtomicBool::new(false)))
    }

    pub fn with_cancel_flag(timeout: Duration, cancelled: Arc<AtomicBool>) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self {
            deadline,
            cancelled,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    /// Time left before the deadline, zero once done.
    pub fn remaining(&self) -> Duration {
        if self.is_cancelled() {
            return Duration::ZERO;
        }
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
