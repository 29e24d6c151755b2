//! # AuthBroker API
//!
//! HTTP presentation layer and process entry point.
//!
//! This crate contains:
//! - axum handlers for the login flow (`/auth/*`) and `/health`
//! - Application context (dependency injection)
//! - Error to HTTP status mapping and the session binding cookie
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Holds no business rules; everything goes through `AuthOrchestrator`

pub mod context;
pub mod error;
pub mod handlers;
pub mod utils;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};
pub use handlers::router;
