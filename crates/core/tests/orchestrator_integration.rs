//! Integration tests for the login orchestrator
//!
//! Drives `AuthOrchestrator` through the mock adapters from
//! `authbroker_core::testing`.

use std::sync::Arc;
use std::time::Duration;

use authbroker_common::auth::pkce::verify_challenge;
use authbroker_core::testing::{
    sample_claims, FailingSessionStore, MockIdentityProvider, MockSessionStore,
    RecordingEventPublisher,
};
use authbroker_core::{AuthOrchestrator, CallbackRequest, OrchestratorSettings, SessionStore};
use authbroker_domain::{AuthEvent, BrokerError, ClientContext, LogoutReason, SessionId};

struct Harness {
    orchestrator: Arc<AuthOrchestrator>,
    store: MockSessionStore,
    identity: MockIdentityProvider,
    events: RecordingEventPublisher,
}

fn harness_with(settings: OrchestratorSettings) -> Harness {
    let store = MockSessionStore::new();
    let identity = MockIdentityProvider::new();
    let events = RecordingEventPublisher::new();
    let orchestrator = AuthOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(identity.clone()),
        Arc::new(events.clone()),
        settings,
    );
    Harness { orchestrator: Arc::new(orchestrator), store, identity, events }
}

fn harness() -> Harness {
    harness_with(OrchestratorSettings::default())
}

fn callback(code: &str, state: &str, binding: Option<&str>) -> CallbackRequest {
    CallbackRequest {
        code: code.to_string(),
        state: state.to_string(),
        binding: binding.map(str::to_string),
        client: ClientContext {
            ip_address: Some("203.0.113.7".into()),
            user_agent: Some("integration-test".into()),
        },
    }
}

/// Validates the full happy path from redirect to claims.
///
/// # Test Steps
/// 1. Begin a login and check the URL carries state and S256 challenge
/// 2. Complete it with the matching binding
/// 3. Verify the verifier sent to the provider matches the advertised
///    challenge, the session is gone and a login event was published
#[tokio::test]
async fn test_begin_then_complete_login() {
    let h = harness();

    let start = h.orchestrator.begin_login().await.expect("begin login");
    let state = start.session_id.to_string();
    assert!(start.authorization_url.contains(&format!("state={state}")));
    assert!(start.authorization_url.contains("code_challenge_method=S256"));
    assert_eq!(start.expires_in, Duration::from_secs(600));

    let stored = h.store.peek(&start.session_id).expect("stored challenge");
    assert!(start.authorization_url.contains(&stored.challenge));

    let outcome = h
        .orchestrator
        .complete_login(callback("code-1", &state, Some(&state)))
        .await
        .expect("complete login");

    assert_eq!(outcome.session_id, start.session_id);
    assert_eq!(outcome.tokens.access_token, "access-code-1");
    assert_eq!(outcome.user.sub, "user-123");

    let verifiers = h.identity.seen_verifiers();
    assert_eq!(verifiers.len(), 1);
    assert!(verify_challenge(&verifiers[0], &stored.challenge));
    assert!(h.store.is_empty());

    let events = h.events.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        AuthEvent::UserLogin(login) => {
            assert_eq!(login.user_id, "user-123");
            assert_eq!(login.username, "Alice");
            assert_eq!(login.provider, "mock");
            assert_eq!(login.ip_address.as_deref(), Some("203.0.113.7"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_each_login_gets_fresh_session_and_challenge() {
    let h = harness();

    let first = h.orchestrator.begin_login().await.expect("first");
    let second = h.orchestrator.begin_login().await.expect("second");

    assert_ne!(first.session_id, second.session_id);
    let first_pkce = h.store.peek(&first.session_id).expect("first entry");
    let second_pkce = h.store.peek(&second.session_id).expect("second entry");
    assert_ne!(first_pkce.verifier, second_pkce.verifier);
    assert_eq!(h.store.len(), 2);
}

/// Validates that a replayed callback cannot redeem a second code.
///
/// Assertions:
/// - The second completion fails with `SessionNotFound`.
/// - The provider saw exactly one exchange.
#[tokio::test]
async fn test_second_callback_is_rejected() {
    let h = harness();
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    h.orchestrator.complete_login(callback("c", &state, Some(&state))).await.expect("first");
    let replay = h.orchestrator.complete_login(callback("c", &state, Some(&state))).await;

    assert_eq!(replay.unwrap_err(), BrokerError::SessionNotFound);
    assert_eq!(h.identity.exchange_calls(), 1);
}

/// Validates that a binding mismatch never touches the store.
///
/// Assertions:
/// - The call fails with `MalformedRequest`.
/// - `consume_once` was never called and the victim's entry survives.
#[tokio::test]
async fn test_binding_mismatch_preserves_session() {
    let h = harness();
    let victim = h.orchestrator.begin_login().await.expect("victim login");
    let attacker = SessionId::new().to_string();

    let result = h
        .orchestrator
        .complete_login(callback("attacker-code", &victim.session_id.to_string(), Some(&attacker)))
        .await;

    assert!(matches!(result, Err(BrokerError::MalformedRequest(_))));
    assert_eq!(h.store.consume_calls(), 0);
    assert!(h.store.peek(&victim.session_id).is_some());
    assert_eq!(h.identity.exchange_calls(), 0);
}

#[tokio::test]
async fn test_missing_binding_is_malformed() {
    let h = harness();
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    for binding in [None, Some("")] {
        let result = h.orchestrator.complete_login(callback("c", &state, binding)).await;
        assert!(matches!(result, Err(BrokerError::MalformedRequest(_))));
    }
    assert_eq!(h.store.consume_calls(), 0);
}

#[tokio::test]
async fn test_empty_code_or_state_is_malformed() {
    let h = harness();
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    let empty_code = h.orchestrator.complete_login(callback("", &state, Some(&state))).await;
    let empty_state = h.orchestrator.complete_login(callback("c", "", Some(&state))).await;

    assert!(matches!(empty_code, Err(BrokerError::MalformedRequest(_))));
    assert!(matches!(empty_state, Err(BrokerError::MalformedRequest(_))));
    assert!(h.store.peek(&start.session_id).is_some());
}

#[tokio::test]
async fn test_garbage_state_is_session_not_found() {
    let h = harness();

    let result = h.orchestrator.complete_login(callback("c", "nope", Some("nope"))).await;

    assert_eq!(result.unwrap_err(), BrokerError::SessionNotFound);
    assert_eq!(h.store.consume_calls(), 0);
}

#[tokio::test]
async fn test_expired_session_is_not_found() {
    let h = harness();
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();
    h.store.expire(&start.session_id);

    let result = h.orchestrator.complete_login(callback("c", &state, Some(&state))).await;

    assert_eq!(result.unwrap_err(), BrokerError::SessionNotFound);
    assert_eq!(h.identity.exchange_calls(), 0);
}

/// Validates that a failed exchange still burns the session.
///
/// Assertions:
/// - The error is `ExchangeFailed`.
/// - A retry with the same state gets `SessionNotFound`.
/// - No login event is published.
#[tokio::test]
async fn test_exchange_failure_consumes_session() {
    let h = harness();
    h.identity.fail_exchange_with(BrokerError::ExchangeFailed("invalid_grant".into()));
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    let first = h.orchestrator.complete_login(callback("c", &state, Some(&state))).await;
    let retry = h.orchestrator.complete_login(callback("c", &state, Some(&state))).await;

    assert!(matches!(first, Err(BrokerError::ExchangeFailed(_))));
    assert_eq!(retry.unwrap_err(), BrokerError::SessionNotFound);
    assert!(h.events.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_exchange_times_out() {
    let h = harness_with(OrchestratorSettings {
        exchange_timeout: Duration::from_secs(10),
        ..OrchestratorSettings::default()
    });
    h.identity.delay_exchange(Duration::from_secs(30));
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    let result = h.orchestrator.complete_login(callback("c", &state, Some(&state))).await;

    assert_eq!(result.unwrap_err(), BrokerError::ExchangeTimeout(Duration::from_secs(10)));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_event_publish_failure_does_not_fail_login() {
    let store = MockSessionStore::new();
    let orchestrator = AuthOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(MockIdentityProvider::new()),
        Arc::new(RecordingEventPublisher::failing()),
        OrchestratorSettings::default(),
    );
    let start = orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    let outcome = orchestrator.complete_login(callback("c", &state, Some(&state))).await;

    assert!(outcome.is_ok());
}

/// Validates the cancel flow and its edge cases.
///
/// Assertions:
/// - Cancelling a live session removes it and records a logout event.
/// - Cancelling again (already gone) still succeeds.
/// - No binding at all is `MalformedRequest("No active session")`.
#[tokio::test]
async fn test_cancel_login() {
    let h = harness();
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    h.orchestrator.cancel_login(Some(&state)).await.expect("cancel");
    assert!(!h.orchestrator.check_session(Some(&state)).await);
    h.orchestrator.cancel_login(Some(&state)).await.expect("cancel twice");
    h.orchestrator.cancel_login(Some("not-a-session")).await.expect("cancel garbage");

    let missing = h.orchestrator.cancel_login(None).await.unwrap_err();
    assert_eq!(missing, BrokerError::MalformedRequest("No active session".into()));

    let logouts: Vec<_> = h
        .events
        .events()
        .into_iter()
        .filter_map(|event| match event {
            AuthEvent::UserLogout(logout) => Some(logout),
            _ => None,
        })
        .collect();
    assert_eq!(logouts.len(), 2);
    assert_eq!(logouts[0].reason, LogoutReason::LoginCancelled);
    assert_eq!(logouts[0].session_id, state);
}

#[tokio::test]
async fn test_check_session_and_expiry() {
    let h = harness();
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    assert!(h.orchestrator.check_session(Some(&state)).await);
    assert!(!h.orchestrator.check_session(None).await);
    assert!(!h.orchestrator.check_session(Some("garbage")).await);

    let remaining = h.orchestrator.session_expires_in(Some(&state)).await.expect("ttl");
    assert!(remaining <= Duration::from_secs(600));
    assert!(remaining > Duration::from_secs(590));

    // Checking is read-only
    assert!(h.store.peek(&start.session_id).is_some());
    assert_eq!(h.store.consume_calls(), 0);
}

#[tokio::test]
async fn test_parse_user_is_stateless() {
    let h = harness();
    h.identity.accept_token("bearer-1", sample_claims("user-9"));

    let claims = h.orchestrator.parse_user("bearer-1").await.expect("claims");
    assert_eq!(claims.sub, "user-9");

    let empty = h.orchestrator.parse_user("  ").await.unwrap_err();
    assert!(matches!(empty, BrokerError::InvalidToken(_)));

    let unknown = h.orchestrator.parse_user("forged").await.unwrap_err();
    assert!(matches!(unknown, BrokerError::InvalidToken(_)));

    assert_eq!(h.store.consume_calls(), 0);
}

/// Validates single-use under contention.
///
/// Sixteen tasks race to complete the same login; exactly one may win.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callbacks_single_winner() {
    let h = harness();
    let start = h.orchestrator.begin_login().await.expect("begin");
    let state = start.session_id.to_string();

    let tasks = (0..16).map(|i| {
        let orchestrator = Arc::clone(&h.orchestrator);
        let state = state.clone();
        tokio::spawn(async move {
            orchestrator.complete_login(callback(&format!("code-{i}"), &state, Some(&state))).await
        })
    });
    let results = futures::future::join_all(tasks).await;

    let mut winners = 0;
    for result in results {
        match result.expect("task panicked") {
            Ok(_) => winners += 1,
            Err(err) => assert_eq!(err, BrokerError::SessionNotFound),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(h.identity.exchange_calls(), 1);
}

#[tokio::test]
async fn test_store_unavailable_surfaces() {
    let orchestrator = AuthOrchestrator::new(
        Arc::new(FailingSessionStore),
        Arc::new(MockIdentityProvider::new()),
        Arc::new(RecordingEventPublisher::new()),
        OrchestratorSettings::default(),
    );
    let state = SessionId::new().to_string();

    assert!(matches!(orchestrator.begin_login().await, Err(BrokerError::StoreUnavailable(_))));
    assert!(matches!(
        orchestrator.complete_login(callback("c", &state, Some(&state))).await,
        Err(BrokerError::StoreUnavailable(_))
    ));
    assert!(matches!(
        orchestrator.cancel_login(Some(&state)).await,
        Err(BrokerError::StoreUnavailable(_))
    ));
    // A status poll degrades instead of failing
    assert!(!orchestrator.check_session(Some(&state)).await);
    assert!(FailingSessionStore.ping().await.is_err());
}
