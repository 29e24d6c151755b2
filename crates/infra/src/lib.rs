//! # AuthBroker Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Session stores (in-memory and SQLite) plus the expiry janitor
//! - The OAuth2 identity provider client and JWT verification
//! - Event publishers
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `authbroker-core`
//! - Contains all "impure" code (I/O, network, clocks)

pub mod config;
pub mod errors;
pub mod events;
pub mod identity;
pub mod observability;
pub mod session_store;

// Re-export commonly used items
pub use errors::InfraError;
pub use events::{LogEventPublisher, NoopEventPublisher};
pub use identity::{JwtTokenVerifier, OAuthIdentityProvider};
pub use observability::init_tracing;
pub use session_store::{spawn_session_janitor, InMemorySessionStore, SqliteSessionStore};
