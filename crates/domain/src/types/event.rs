//! Typed authentication notifications
//!
//! Each notification kind is a variant with its own payload struct. The wire
//! form wraps the payload in an [`EventEnvelope`]:
//!
//! ```json
//! {
//!   "eventType": "auth.user.login",
//!   "version": "1.0",
//!   "data": { "userId": "...", "username": "...", "timestamp": "..." },
//!   "metadata": { "correlationId": "..." }
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::constants::{
    EVENT_SCHEMA_VERSION, EVENT_TOKEN_REFRESHED, EVENT_USER_LOGIN, EVENT_USER_LOGOUT,
};
use crate::errors::{BrokerError, Result};
use crate::impl_domain_status_conversions;

fn rfc3339<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// A user completed a login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginEvent {
    pub user_id: String,
    pub username: String,
    pub role: Option<String>,
    pub login_method: String,
    pub provider: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The login attempt was abandoned before the callback
    LoginCancelled,
    UserInitiated,
    Expired,
}

impl_domain_status_conversions!(LogoutReason {
    LoginCancelled => "login_cancelled",
    UserInitiated => "user_initiated",
    Expired => "expired",
});

/// A session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLogoutEvent {
    /// Unknown when the session ends before any user authenticated
    pub user_id: Option<String>,
    pub session_id: String,
    pub reason: LogoutReason,
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshedEvent {
    pub user_id: String,
    pub session_id: String,
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

/// Closed set of notifications the broker emits
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    UserLogin(UserLoginEvent),
    UserLogout(UserLogoutEvent),
    TokenRefreshed(TokenRefreshedEvent),
}

impl AuthEvent {
    /// Wire event type (`auth.user.login`, ...)
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserLogin(_) => EVENT_USER_LOGIN,
            Self::UserLogout(_) => EVENT_USER_LOGOUT,
            Self::TokenRefreshed(_) => EVENT_TOKEN_REFRESHED,
        }
    }

    fn data(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::UserLogin(payload) => serde_json::to_value(payload),
            Self::UserLogout(payload) => serde_json::to_value(payload),
            Self::TokenRefreshed(payload) => serde_json::to_value(payload),
        }
    }

    /// Wrap in an envelope with a fresh correlation id
    ///
    /// # Errors
    /// Returns [`BrokerError::Internal`] if the payload cannot be encoded.
    pub fn into_envelope(self) -> Result<EventEnvelope> {
        self.envelope_with(Uuid::new_v4().to_string())
    }

    /// Wrap in an envelope that continues an existing correlation id
    ///
    /// # Errors
    /// Returns [`BrokerError::Internal`] if the payload cannot be encoded.
    pub fn envelope_with(self, correlation_id: String) -> Result<EventEnvelope> {
        let data = self
            .data()
            .map_err(|e| BrokerError::Internal(format!("Failed to encode event: {e}")))?;
        Ok(EventEnvelope {
            event_type: self.kind().to_string(),
            version: EVENT_SCHEMA_VERSION.to_string(),
            data,
            metadata: EventMetadata { correlation_id },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub correlation_id: String,
}

/// Versioned wire form of an [`AuthEvent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_type: String,
    pub version: String,
    pub data: serde_json::Value,
    pub metadata: EventMetadata,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().expect("valid timestamp")
    }

    /// Validates the login envelope against the downstream consumer shape.
    ///
    /// Assertions:
    /// - `eventType`, `version` and `metadata.correlationId` are present.
    /// - Payload keys are camelCase and the timestamp is RFC 3339 UTC.
    #[test]
    fn test_login_envelope_shape() {
        let event = AuthEvent::UserLogin(UserLoginEvent {
            user_id: "u-1".into(),
            username: "alice".into(),
            role: Some("admin".into()),
            login_method: "oauth2_pkce".into(),
            provider: "casdoor".into(),
            ip_address: Some("203.0.113.9".into()),
            user_agent: None,
            timestamp: fixed_time(),
        });

        let envelope = event.envelope_with("corr-1".into()).expect("envelope");
        let json = serde_json::to_value(&envelope).expect("serialize");

        assert_eq!(json["eventType"], "auth.user.login");
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["metadata"]["correlationId"], "corr-1");
        assert_eq!(json["data"]["userId"], "u-1");
        assert_eq!(json["data"]["loginMethod"], "oauth2_pkce");
        assert_eq!(json["data"]["ipAddress"], "203.0.113.9");
        assert_eq!(json["data"]["timestamp"], "2024-05-01T12:30:00Z");
    }

    #[test]
    fn test_logout_reason_is_snake_case() {
        let event = AuthEvent::UserLogout(UserLogoutEvent {
            user_id: None,
            session_id: "s-1".into(),
            reason: LogoutReason::LoginCancelled,
            timestamp: fixed_time(),
        });

        assert_eq!(event.kind(), "auth.user.logout");
        let envelope = event.into_envelope().expect("envelope");
        assert_eq!(envelope.data["reason"], "login_cancelled");
        assert!(!envelope.metadata.correlation_id.is_empty());
    }

    #[test]
    fn test_token_refreshed_kind() {
        let event = AuthEvent::TokenRefreshed(TokenRefreshedEvent {
            user_id: "u-1".into(),
            session_id: "s-1".into(),
            timestamp: fixed_time(),
        });

        assert_eq!(event.kind(), "auth.token.refreshed");
    }
}
