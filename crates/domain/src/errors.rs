//! Error types used throughout the broker

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for AuthBroker
///
/// Variants carry diagnostic detail for logs. Anything returned to an HTTP
/// client goes through [`BrokerError::public_message`] instead of `Display`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BrokerError {
    /// The session store could not be reached or failed mid-operation.
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// No live entry for the session: never created, expired, or already
    /// consumed. These cases are deliberately indistinguishable.
    #[error("Session not found or expired")]
    SessionNotFound,

    /// The identity provider rejected the code/verifier pair or answered
    /// with something unusable.
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Token exchange timed out after {0:?}")]
    ExchangeTimeout(Duration),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Missing or inconsistent request input (empty code, state/binding
    /// mismatch, no binding at all).
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Message that is safe to hand to an unauthenticated caller
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "Session storage temporarily unavailable",
            Self::SessionNotFound => "Invalid or expired session",
            Self::ExchangeFailed(_) => "Failed to exchange authorization code",
            Self::ExchangeTimeout(_) => "Identity provider did not respond in time",
            Self::InvalidToken(_) => "Invalid token",
            Self::MalformedRequest(_) => "Invalid request",
            Self::Config(_) | Self::Internal(_) => "Internal server error",
        }
    }

    /// Whether the user can recover by starting a fresh login
    ///
    /// Nothing is retried with the same code: by the time an exchange runs,
    /// the session entry has been consumed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::SessionNotFound | Self::ExchangeTimeout(_)
        )
    }
}

/// Result type alias for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;
