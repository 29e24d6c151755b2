//! Login orchestrator - core business logic
//!
//! Drives one login attempt from redirect to token exchange:
//!
//! 1. [`AuthOrchestrator::begin_login`] creates a session, stores its PKCE
//!    challenge and returns the provider URL.
//! 2. [`AuthOrchestrator::complete_login`] checks the browser binding,
//!    consumes the challenge exactly once and redeems the code.
//! 3. [`AuthOrchestrator::cancel_login`] abandons an attempt.
//!
//! The browser binding (cookie value) is passed in explicitly; this module
//! never sees HTTP.

use std::sync::Arc;
use std::time::Duration;

use authbroker_common::auth::pkce::{validate_state, PkceChallenge};
use authbroker_domain::constants::{
    DEFAULT_EXCHANGE_TIMEOUT_SECS, DEFAULT_SESSION_TTL_SECS, LOGIN_METHOD_OAUTH_PKCE,
};
use authbroker_domain::types::event::{UserLoginEvent, UserLogoutEvent};
use authbroker_domain::{
    AuthEvent, BrokerError, ClientContext, LoginState, LogoutReason, Result, SessionId,
    TokenGrant, UserClaims,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::ports::{AuthEventPublisher, AuthorizationRequest, IdentityProvider, SessionStore};

/// Tunables for [`AuthOrchestrator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Lifetime of an unconsumed login attempt
    pub session_ttl: Duration,
    /// Upper bound on the token endpoint round trip
    pub exchange_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            exchange_timeout: Duration::from_secs(DEFAULT_EXCHANGE_TIMEOUT_SECS),
        }
    }
}

/// Result of [`AuthOrchestrator::begin_login`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub authorization_url: String,
    pub session_id: SessionId,
    /// How long the caller should keep the binding (cookie max-age)
    pub expires_in: Duration,
}

/// Input of [`AuthOrchestrator::complete_login`]
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    /// `code` query parameter from the provider redirect
    pub code: String,
    /// `state` query parameter from the provider redirect
    pub state: String,
    /// Session binding held by the browser, if any
    pub binding: Option<String>,
    pub client: ClientContext,
}

/// Result of a successful [`AuthOrchestrator::complete_login`]
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: SessionId,
    pub tokens: TokenGrant,
    pub user: UserClaims,
}

/// Login orchestrator
pub struct AuthOrchestrator {
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn IdentityProvider>,
    events: Arc<dyn AuthEventPublisher>,
    settings: OrchestratorSettings,
}

impl AuthOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        events: Arc<dyn AuthEventPublisher>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self { store, identity, events, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Start a login attempt
    ///
    /// The authorization URL is built before anything is written, so a
    /// provider misconfiguration leaves no orphaned session behind.
    ///
    /// # Errors
    /// - `StoreUnavailable` if the challenge cannot be stored
    /// - `Config` if the provider URL cannot be built
    pub async fn begin_login(&self) -> Result<LoginStart> {
        let session_id = SessionId::new();
        let pkce = PkceChallenge::generate();
        debug!(session_id = %session_id, state = %LoginState::Initiated, "Login initiated");

        let request = AuthorizationRequest {
            state: session_id.to_string(),
            code_challenge: pkce.challenge.clone(),
            code_challenge_method: pkce.method,
        };
        let authorization_url = self.identity.authorization_url(&request)?;

        self.store.save(&session_id, &pkce, self.settings.session_ttl).await?;
        log_transition(&session_id, LoginState::Initiated, LoginState::AwaitingCallback);

        Ok(LoginStart {
            authorization_url,
            session_id,
            expires_in: self.settings.session_ttl,
        })
    }

    /// Finish a login attempt from the provider callback
    ///
    /// Input and binding checks run before the store is touched, so a forged
    /// callback cannot burn a victim's session. Once the challenge has been
    /// consumed any later failure is final: the attempt cannot be retried.
    ///
    /// # Errors
    /// - `MalformedRequest` for empty `code`/`state`, or a missing or
    ///   mismatched binding
    /// - `SessionNotFound` if the session is unknown, expired or consumed
    /// - `ExchangeFailed` / `ExchangeTimeout` from the token endpoint
    /// - `InvalidToken` if the returned access token does not verify
    /// - `StoreUnavailable` if the store cannot be reached
    pub async fn complete_login(&self, request: CallbackRequest) -> Result<LoginOutcome> {
        let CallbackRequest { code, state, binding, client } = request;

        if code.trim().is_empty() {
            return Err(BrokerError::MalformedRequest("missing authorization code".into()));
        }
        if state.trim().is_empty() {
            return Err(BrokerError::MalformedRequest("missing state".into()));
        }
        let Some(binding) = binding.filter(|value| !value.is_empty()) else {
            warn!("Callback without session binding");
            return Err(BrokerError::MalformedRequest("missing session binding".into()));
        };
        if !validate_state(&binding, &state) {
            warn!("Callback state does not match session binding");
            return Err(BrokerError::MalformedRequest("state does not match session".into()));
        }

        let session_id = SessionId::parse(&state)?;
        let pkce = match self.store.consume_once(&session_id).await {
            Ok(pkce) => pkce,
            Err(BrokerError::SessionNotFound) => {
                info!(session_id = %session_id, "Callback for unknown, expired or used session");
                return Err(BrokerError::SessionNotFound);
            }
            Err(err) => return Err(err),
        };

        let exchange = self.identity.exchange_code(&code, &pkce.verifier);
        let tokens = match tokio::time::timeout(self.settings.exchange_timeout, exchange).await {
            Ok(result) => result.inspect_err(|err| {
                warn!(session_id = %session_id, error = %err, "Token exchange failed");
            })?,
            Err(_) => {
                warn!(
                    session_id = %session_id,
                    timeout_ms = self.settings.exchange_timeout.as_millis() as u64,
                    "Token exchange timed out"
                );
                return Err(BrokerError::ExchangeTimeout(self.settings.exchange_timeout));
            }
        };

        let user = self.identity.parse_access_token(&tokens.access_token).await.inspect_err(
            |err| warn!(session_id = %session_id, error = %err, "Issued access token rejected"),
        )?;

        log_transition(&session_id, LoginState::AwaitingCallback, LoginState::Exchanged);
        info!(session_id = %session_id, user_id = %user.sub, "Login completed");

        self.publish(AuthEvent::UserLogin(UserLoginEvent {
            user_id: user.sub.clone(),
            username: user.username().to_string(),
            role: user.role(),
            login_method: LOGIN_METHOD_OAUTH_PKCE.to_string(),
            provider: self.identity.name().to_string(),
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            timestamp: Utc::now(),
        }))
        .await;

        Ok(LoginOutcome { session_id, tokens, user })
    }

    /// Abandon a login attempt
    ///
    /// A binding that cannot name a session has nothing to cancel and
    /// succeeds.
    ///
    /// # Errors
    /// - `MalformedRequest` when there is no binding at all
    /// - `StoreUnavailable` if the store cannot be reached
    pub async fn cancel_login(&self, binding: Option<&str>) -> Result<()> {
        let Some(raw) = binding.filter(|value| !value.is_empty()) else {
            return Err(BrokerError::MalformedRequest("No active session".into()));
        };
        let Ok(session_id) = SessionId::parse(raw) else {
            debug!("Cancel with unparseable session binding ignored");
            return Ok(());
        };

        self.store.delete(&session_id).await?;
        log_transition(&session_id, LoginState::AwaitingCallback, LoginState::Cancelled);

        self.publish(AuthEvent::UserLogout(UserLogoutEvent {
            user_id: None,
            session_id: session_id.to_string(),
            reason: LogoutReason::LoginCancelled,
            timestamp: Utc::now(),
        }))
        .await;

        Ok(())
    }

    /// Whether the binding names a live, unconsumed login attempt
    ///
    /// Never fails: store errors are logged and reported as `false`.
    pub async fn check_session(&self, binding: Option<&str>) -> bool {
        let Some(session_id) = binding.and_then(|raw| SessionId::parse(raw).ok()) else {
            return false;
        };

        match self.store.exists(&session_id).await {
            Ok(exists) => exists,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Session check failed");
                false
            }
        }
    }

    /// Time left on a live login attempt, for diagnostics
    pub async fn session_expires_in(&self, binding: Option<&str>) -> Option<Duration> {
        let session_id = SessionId::parse(binding?).ok()?;

        match self.store.ttl_remaining(&session_id).await {
            Ok(remaining) => Some(remaining),
            Err(BrokerError::SessionNotFound) => None,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Session TTL lookup failed");
                None
            }
        }
    }

    /// Verify a bearer access token and return its claims
    ///
    /// Stateless: does not consult the session store.
    ///
    /// # Errors
    /// Returns `InvalidToken` for an empty, malformed, expired or
    /// wrongly-signed token.
    pub async fn parse_user(&self, access_token: &str) -> Result<UserClaims> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(BrokerError::InvalidToken("empty token".into()));
        }
        self.identity.parse_access_token(token).await
    }

    async fn publish(&self, event: AuthEvent) {
        let kind = event.kind();
        if let Err(err) = self.events.publish(event).await {
            warn!(event_type = kind, error = %err, "Failed to publish auth event");
        }
    }
}

fn log_transition(session_id: &SessionId, from: LoginState, to: LoginState) {
    if !from.can_transition_to(to) {
        warn!(
            session_id = %session_id,
            from = %from,
            to = %to,
            "Unexpected login state transition"
        );
        return;
    }
    debug!(session_id = %session_id, from = %from, to = %to, "Login state transition");
}
