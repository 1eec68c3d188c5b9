use chrono::Utc;
use std::cell::Cell;

/// Source of wall-clock timestamps for input events. The matcher only ever
/// sees timestamps through this seam, so tests can feed synthetic times
/// instead of sleeping.
pub trait Clock {
    /// Current time in milliseconds since the Unix epoch (or an arbitrary
    /// fixed origin for manual clocks).
    fn now_ms(&self) -> u64;
}

/// Production clock backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    current_ms: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        Self {
            current_ms: Cell::new(ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.current_ms.set(ms);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.current_ms.set(self.current_ms.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.get()
    }
}
