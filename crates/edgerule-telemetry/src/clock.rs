//! Unique millisecond timestamps

use chrono::Utc;
use parking_lot::Mutex;

/// Millisecond clock whose readings strictly increase.
///
/// Two readings within the same wall-clock millisecond are told apart by
/// bumping the later one past the previous value.
pub struct MonotonicClock {
    source: fn() -> i64,
    last: Mutex<Option<i64>>,
}

impl MonotonicClock {
    /// Clock backed by the system wall clock
    pub fn new() -> Self {
        Self::with_source(wall_clock_ms)
    }

    /// Clock backed by a custom millisecond source
    pub fn with_source(source: fn() -> i64) -> Self {
        Self {
            source,
            last: Mutex::new(None),
        }
    }

    /// Current timestamp, greater than every previous reading
    pub fn now_ms(&self) -> i64 {
        let mut last = self.last.lock();
        let now = (self.source)();

        let next = match *last {
            Some(previous) if now <= previous => previous + 1,
            _ => now,
        };

        *last = Some(next);
        next
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

fn wall_clock_ms() -> i64 {
    Utc::now().timestamp_millis()
}
