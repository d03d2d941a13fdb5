use std::time::{Duration, Instant};

/// Periodic trigger for automatic recomputation.
///
/// The host loop owns the timer and asks it how long it may block waiting
/// for input. Whether a due tick actually recomputes is decided by the
/// project's auto-update flag.
#[derive(Debug, Clone)]
pub struct AutoUpdateTimer {
    interval: Duration,
    next_due: Instant,
}

impl AutoUpdateTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// Time left before the next tick, zero if it is already due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }

    /// Returns true and re-arms the timer if a tick is due.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }
}
