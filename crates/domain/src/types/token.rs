//! Token material returned by the identity provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a successful authorization code exchange
///
/// Opaque to the broker apart from the access token, which is parsed for
/// user claims.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry derived from the provider's `expires_in`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl TokenGrant {
    /// Seconds until `expires_at`, clamped at zero
    #[must_use]
    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<u64> {
        self.expires_at
            .map(|at| u64::try_from((at - now).num_seconds()).unwrap_or(0))
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_expires_in_clamps_past_expiry() {
        let now = Utc::now();
        let grant = TokenGrant {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Some(now - Duration::seconds(5)),
            token_type: "Bearer".into(),
        };

        assert_eq!(grant.expires_in(now), Some(0));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let grant = TokenGrant {
            access_token: "eyJsecret".into(),
            refresh_token: Some("refresh-secret".into()),
            expires_at: None,
            token_type: "Bearer".into(),
        };
        let rendered = format!("{grant:?}");

        assert!(!rendered.contains("eyJsecret"));
        assert!(!rendered.contains("refresh-secret"));
    }
}
