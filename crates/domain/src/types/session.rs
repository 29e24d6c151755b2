//! Authorization session identity and lifecycle

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::SESSION_KEY_PREFIX;
use crate::errors::BrokerError;
use crate::impl_domain_status_conversions;

/// Identifier of one login attempt
///
/// Doubles as the OAuth2 `state` parameter and as the value of the browser
/// binding cookie. Always a random (v4) UUID rendered in hyphenated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an untrusted value (callback `state`, cookie)
    ///
    /// # Errors
    /// Returns [`BrokerError::SessionNotFound`]: a value that cannot be a
    /// session id cannot name a live session.
    pub fn parse(raw: &str) -> Result<Self, BrokerError> {
        Uuid::parse_str(raw.trim()).map(Self).map_err(|_| BrokerError::SessionNotFound)
    }

    /// Key under which the session's PKCE entry is stored
    #[must_use]
    pub fn store_key(&self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.0)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Login attempt lifecycle
///
/// ```text
/// Initiated -> AwaitingCallback -> Exchanged
///                    |-> Cancelled
///                    `-> Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    Initiated,
    AwaitingCallback,
    Exchanged,
    Cancelled,
    Expired,
}

impl_domain_status_conversions!(LoginState {
    Initiated => "initiated",
    AwaitingCallback => "awaiting_callback",
    Exchanged => "exchanged",
    Cancelled => "cancelled",
    Expired => "expired",
});

impl LoginState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exchanged | Self::Cancelled | Self::Expired)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initiated, Self::AwaitingCallback)
                | (Self::AwaitingCallback, Self::Exchanged | Self::Cancelled | Self::Expired)
        )
    }
}

/// Request metadata attached to audit events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
