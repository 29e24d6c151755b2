//! Auth event publishers
//!
//! Events leave the broker as versioned JSON envelopes. The log publisher
//! writes them as structured `tracing` records under the
//! `authbroker::events` target, where a log shipper can forward them.

use async_trait::async_trait;
use authbroker_core::AuthEventPublisher;
use authbroker_domain::{AuthEvent, EventEnvelope, Result};
use tracing::{debug, info};

use crate::errors::InfraError;

/// Tracing target for emitted events
pub const EVENT_TARGET: &str = "authbroker::events";

/// Publisher that emits each event envelope as a log record
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventPublisher;

impl LogEventPublisher {
    pub fn new() -> Self {
        Self
    }

    fn encode(envelope: &EventEnvelope) -> Result<String> {
        serde_json::to_string(envelope).map_err(|e| InfraError::from(e).into())
    }
}

#[async_trait]
impl AuthEventPublisher for LogEventPublisher {
    async fn publish(&self, event: AuthEvent) -> Result<()> {
        let envelope = event.into_envelope()?;
        let payload = Self::encode(&envelope)?;

        info!(
            target: EVENT_TARGET,
            event_type = %envelope.event_type,
            correlation_id = %envelope.metadata.correlation_id,
            payload = %payload,
            "auth event"
        );
        Ok(())
    }
}

/// Publisher that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventPublisher;

#[async_trait]
impl AuthEventPublisher for NoopEventPublisher {
    async fn publish(&self, event: AuthEvent) -> Result<()> {
        debug!(event_type = event.kind(), "Event publishing disabled; dropping event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use authbroker_domain::{LogoutReason, UserLogoutEvent};
    use chrono::Utc;

    use super::*;

    fn logout_event() -> AuthEvent {
        AuthEvent::UserLogout(UserLogoutEvent {
            user_id: None,
            session_id: "5f0c4e5e-8d7a-4c1e-9b1a-2f3d4e5f6a7b".into(),
            reason: LogoutReason::LoginCancelled,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_log_publisher_accepts_events() {
        LogEventPublisher::new().publish(logout_event()).await.expect("publish");
    }

    #[tokio::test]
    async fn test_noop_publisher_accepts_events() {
        NoopEventPublisher.publish(logout_event()).await.expect("publish");
    }

    #[test]
    fn test_encoded_envelope_shape() {
        let envelope = logout_event().into_envelope().expect("envelope");
        let encoded = LogEventPublisher::encode(&envelope).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&encoded).expect("json");

        assert_eq!(value["eventType"], "auth.user.logout");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["data"]["sessionId"], "5f0c4e5e-8d7a-4c1e-9b1a-2f3d4e5f6a7b");
        assert!(value["metadata"]["correlationId"].as_str().is_some_and(|id| !id.is_empty()));
    }
}
