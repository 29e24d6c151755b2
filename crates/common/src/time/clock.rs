use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time
///
/// Implementations must be cheap to call and safe to share between the
/// request handlers and the background janitor.
pub trait Clock: Send + Sync {
    /// Monotonic instant, used for in-process expiry deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time, used where a deadline has to outlive the process.
    fn system_time(&self) -> SystemTime;

    /// Milliseconds since the UNIX epoch
    ///
    /// Clamps to zero for clocks set before 1970 and saturates at
    /// `u64::MAX`.
    fn millis_since_epoch(&self) -> u64 {
        let millis = self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// Real system clock
///
/// ```
/// use authbroker_common::time::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert!(clock.millis_since_epoch() > 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}
