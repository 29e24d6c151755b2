//! Port interfaces for the login flow
//!
//! These traits define the boundaries between the orchestrator and the
//! infrastructure adapters (session storage, identity provider, event bus).

use std::time::Duration;

use async_trait::async_trait;
use authbroker_common::auth::pkce::{ChallengeMethod, PkceChallenge};
use authbroker_domain::{AuthEvent, Result, SessionId, TokenGrant, UserClaims};

/// Short-lived storage for PKCE challenges keyed by session
///
/// Implementations must make [`SessionStore::consume_once`] atomic: when
/// several callers race on the same id, exactly one receives the challenge
/// and every other caller gets `SessionNotFound`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write (or overwrite) the entry with an expiry `ttl` from now
    async fn save(&self, id: &SessionId, challenge: &PkceChallenge, ttl: Duration) -> Result<()>;

    /// Atomically read and delete the entry
    ///
    /// Missing, expired and already consumed entries all yield
    /// `SessionNotFound`.
    async fn consume_once(&self, id: &SessionId) -> Result<PkceChallenge>;

    /// Whether a live entry exists; never extends or consumes it
    async fn exists(&self, id: &SessionId) -> Result<bool>;

    /// Remove the entry; deleting an absent entry succeeds
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Time left before the entry expires
    async fn ttl_remaining(&self, id: &SessionId) -> Result<Duration>;

    /// Drop every expired entry, returning how many were removed
    async fn purge_expired(&self) -> Result<usize>;

    /// Cheap liveness probe of the backend
    async fn ping(&self) -> Result<()>;
}

/// Parameters of one authorization redirect
///
/// Client id, redirect URI and scopes belong to the provider adapter's
/// registration and are not repeated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub state: String,
    pub code_challenge: String,
    pub code_challenge_method: ChallengeMethod,
}

/// OAuth2 identity provider as seen by the relying party
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the URL the browser is redirected to
    fn authorization_url(&self, request: &AuthorizationRequest) -> Result<String>;

    /// Redeem an authorization code together with its PKCE verifier
    ///
    /// Must not retry: authorization codes are single use.
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenGrant>;

    /// Verify an access token issued by this provider and extract its claims
    async fn parse_access_token(&self, access_token: &str) -> Result<UserClaims>;

    /// Short provider label used in audit events
    fn name(&self) -> &str {
        "oauth2"
    }
}

/// Sink for authentication notifications
#[async_trait]
pub trait AuthEventPublisher: Send + Sync {
    async fn publish(&self, event: AuthEvent) -> Result<()>;
}
