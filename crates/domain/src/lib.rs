//! # AuthBroker Domain
//!
//! Domain types shared by every AuthBroker crate.
//!
//! This crate contains:
//! - The broker error type and `Result` alias
//! - Configuration structures (deserialised by the infra loader)
//! - Session, token, user and event types
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other AuthBroker crates
//! - No I/O; pure data and validation

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
