//! Test doubles shared by the broker crates
//!
//! - **[`time`]**: [`MockClock`], a manually advanced [`Clock`](crate::time::Clock)
//!
//! ```rust
//! use std::time::Duration;
//!
//! use authbroker_common::testing::MockClock;
//!
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(601));
//! assert_eq!(clock.elapsed(), Duration::from_secs(601));
//! ```

pub mod time;

pub use time::MockClock;
