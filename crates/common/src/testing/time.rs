//! Deterministic clock for expiry tests
//!
//! Session TTL tests should never sleep for ten minutes; they advance a
//! [`MockClock`] instead.

// Test utility: poisoned mutexes panic so the failing test surfaces early
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use crate::time::Clock;

/// Manually advanced clock
///
/// Clones share the same elapsed offset, so a clone handed to a store and
/// the one kept by the test always agree.
///
/// ```
/// use std::time::Duration;
///
/// use authbroker_common::testing::MockClock;
/// use authbroker_common::time::Clock;
///
/// let clock = MockClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    base_system_time: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a clock anchored at the current real time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            base_system_time: SystemTime::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().expect("mutex poisoned");
        *elapsed += duration;
    }

    /// Replace the simulated offset with an absolute value.
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock().expect("mutex poisoned") = duration;
    }

    /// Simulated time since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("mutex poisoned")
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + self.elapsed()
    }
}
