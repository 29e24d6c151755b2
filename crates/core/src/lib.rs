//! # AuthBroker Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the session store, identity provider and event sink
//! - The login orchestrator driving the PKCE authorization code flow
//!
//! ## Architecture Principles
//! - Only depends on `authbroker-common` and `authbroker-domain`
//! - No database, HTTP, or cookie handling
//! - All external dependencies via traits

pub mod auth;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use auth::ports::{AuthEventPublisher, AuthorizationRequest, IdentityProvider, SessionStore};
pub use auth::service::{
    AuthOrchestrator, CallbackRequest, LoginOutcome, LoginStart, OrchestratorSettings,
};
