//! Clock abstraction
//!
//! Session expiry is computed from an injected [`Clock`] instead of calling
//! `Instant::now()` directly, so stores can be driven by a mock clock in
//! tests (see `testing::MockClock` behind the `test-utils` feature).

pub mod clock;

pub use clock::{Clock, SystemClock};
