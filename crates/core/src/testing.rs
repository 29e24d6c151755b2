//! In-memory doubles for the auth ports
//!
//! Enabled with the `test-utils` feature. Shared by this crate's integration
//! tests and by the API crate's HTTP tests.

// Test utility: poisoned mutexes panic so the failing test surfaces early
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use authbroker_common::auth::pkce::PkceChallenge;
use authbroker_domain::{AuthEvent, BrokerError, Result, SessionId, TokenGrant, UserClaims};

use crate::auth::ports::{AuthEventPublisher, AuthorizationRequest, IdentityProvider, SessionStore};

/// Mutex-backed session store with call counters
///
/// The whole map sits behind one lock, which makes `consume_once` trivially
/// atomic.
#[derive(Default, Clone)]
pub struct MockSessionStore {
    entries: Arc<Mutex<HashMap<String, (PkceChallenge, Instant)>>>,
    consume_calls: Arc<AtomicUsize>,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `consume_once` calls seen, successful or not
    pub fn consume_calls(&self) -> usize {
        self.consume_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored challenge for `id`, without consuming it
    pub fn peek(&self, id: &SessionId) -> Option<PkceChallenge> {
        let entries = self.entries.lock().expect("mutex poisoned");
        entries.get(&id.store_key()).map(|(pkce, _)| pkce.clone())
    }

    /// Force the entry for `id` to look expired
    pub fn expire(&self, id: &SessionId) {
        if let Some(entry) = self.entries.lock().expect("mutex poisoned").get_mut(&id.store_key()) {
            entry.1 = Instant::now();
        }
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn save(&self, id: &SessionId, challenge: &PkceChallenge, ttl: Duration) -> Result<()> {
        self.entries
            .lock()
            .expect("mutex poisoned")
            .insert(id.store_key(), (challenge.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn consume_once(&self, id: &SessionId) -> Result<PkceChallenge> {
        self.consume_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.entries.lock().expect("mutex poisoned").remove(&id.store_key());
        match entry {
            Some((pkce, expires_at)) if expires_at > Instant::now() => Ok(pkce),
            _ => Err(BrokerError::SessionNotFound),
        }
    }

    async fn exists(&self, id: &SessionId) -> Result<bool> {
        let entries = self.entries.lock().expect("mutex poisoned");
        Ok(entries.get(&id.store_key()).is_some_and(|(_, at)| *at > Instant::now()))
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.entries.lock().expect("mutex poisoned").remove(&id.store_key());
        Ok(())
    }

    async fn ttl_remaining(&self, id: &SessionId) -> Result<Duration> {
        let entries = self.entries.lock().expect("mutex poisoned");
        match entries.get(&id.store_key()) {
            Some((_, at)) if *at > Instant::now() => Ok(*at - Instant::now()),
            _ => Err(BrokerError::SessionNotFound),
        }
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.entries.lock().expect("mutex poisoned");
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, (_, at)| *at > now);
        Ok(before - entries.len())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Store whose backend is always down
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSessionStore;

impl FailingSessionStore {
    fn unavailable<T>() -> Result<T> {
        Err(BrokerError::StoreUnavailable("connection refused".into()))
    }
}

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn save(&self, _: &SessionId, _: &PkceChallenge, _: Duration) -> Result<()> {
        Self::unavailable()
    }

    async fn consume_once(&self, _: &SessionId) -> Result<PkceChallenge> {
        Self::unavailable()
    }

    async fn exists(&self, _: &SessionId) -> Result<bool> {
        Self::unavailable()
    }

    async fn delete(&self, _: &SessionId) -> Result<()> {
        Self::unavailable()
    }

    async fn ttl_remaining(&self, _: &SessionId) -> Result<Duration> {
        Self::unavailable()
    }

    async fn purge_expired(&self) -> Result<usize> {
        Self::unavailable()
    }

    async fn ping(&self) -> Result<()> {
        Self::unavailable()
    }
}

/// Scripted identity provider
///
/// Issues `access-<code>` tokens and accepts only tokens it issued (plus any
/// registered with [`MockIdentityProvider::accept_token`]).
#[derive(Clone)]
pub struct MockIdentityProvider {
    exchange_error: Arc<Mutex<Option<BrokerError>>>,
    exchange_delay: Arc<Mutex<Option<Duration>>>,
    issued_claims: Arc<Mutex<HashMap<String, UserClaims>>>,
    seen_verifiers: Arc<Mutex<Vec<String>>>,
    exchange_calls: Arc<AtomicUsize>,
    claims_template: UserClaims,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            exchange_error: Arc::new(Mutex::new(None)),
            exchange_delay: Arc::new(Mutex::new(None)),
            issued_claims: Arc::new(Mutex::new(HashMap::new())),
            seen_verifiers: Arc::new(Mutex::new(Vec::new())),
            exchange_calls: Arc::new(AtomicUsize::new(0)),
            claims_template: sample_claims("user-123"),
        }
    }

    /// Make every exchange fail with `error`
    pub fn fail_exchange_with(&self, error: BrokerError) {
        *self.exchange_error.lock().expect("mutex poisoned") = Some(error);
    }

    /// Delay every exchange by `delay`
    pub fn delay_exchange(&self, delay: Duration) {
        *self.exchange_delay.lock().expect("mutex poisoned") = Some(delay);
    }

    pub fn accept_token(&self, token: &str, claims: UserClaims) {
        self.issued_claims.lock().expect("mutex poisoned").insert(token.to_string(), claims);
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Verifiers received by `exchange_code`, in call order
    pub fn seen_verifiers(&self) -> Vec<String> {
        self.seen_verifiers.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn authorization_url(&self, request: &AuthorizationRequest) -> Result<String> {
        Ok(format!(
            "https://idp.test/authorize?state={}&code_challenge={}&code_challenge_method={}",
            request.state, request.code_challenge, request.code_challenge_method
        ))
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenGrant> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_verifiers.lock().expect("mutex poisoned").push(code_verifier.to_string());

        let delay = *self.exchange_delay.lock().expect("mutex poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.exchange_error.lock().expect("mutex poisoned").clone() {
            return Err(error);
        }

        let access_token = format!("access-{code}");
        self.accept_token(&access_token, self.claims_template.clone());
        Ok(TokenGrant {
            access_token,
            refresh_token: Some(format!("refresh-{code}")),
            expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
            token_type: "Bearer".into(),
        })
    }

    async fn parse_access_token(&self, access_token: &str) -> Result<UserClaims> {
        self.issued_claims
            .lock()
            .expect("mutex poisoned")
            .get(access_token)
            .cloned()
            .ok_or_else(|| BrokerError::InvalidToken("unknown token".into()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Publisher that keeps every event
#[derive(Default, Clone)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<AuthEvent>>>,
    fail: bool,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publisher that records nothing and always errors
    pub fn failing() -> Self {
        Self { events: Arc::default(), fail: true }
    }

    pub fn events(&self) -> Vec<AuthEvent> {
        self.events.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl AuthEventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: AuthEvent) -> Result<()> {
        if self.fail {
            return Err(BrokerError::Internal("event bus down".into()));
        }
        self.events.lock().expect("mutex poisoned").push(event);
        Ok(())
    }
}

/// Claims for a fictional user, valid for an hour
pub fn sample_claims(sub: &str) -> UserClaims {
    UserClaims {
        sub: sub.to_string(),
        name: Some("alice".into()),
        display_name: Some("Alice".into()),
        email: Some("alice@example.com".into()),
        owner: Some("acme".into()),
        iss: Some("https://idp.test".into()),
        exp: chrono::Utc::now().timestamp() + 3600,
        iat: None,
        extra: serde_json::Map::new(),
    }
}
