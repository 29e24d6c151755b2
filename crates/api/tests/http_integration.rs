//! End-to-end HTTP tests for the `/auth/*` and `/health` routes.

mod support;

use std::sync::Arc;
use std::time::Duration;

use authbroker_core::testing::{sample_claims, FailingSessionStore};
use authbroker_domain::{AuthEvent, LogoutReason, SessionId};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use support::{
    app_with_store, begin_login, get, get_with_cookie, json_body, send, set_cookie, test_app,
    test_app_with, test_config,
};

fn callback_uri(code: &str, state: &str) -> String {
    format!("/auth/callback?code={code}&state={state}")
}

/// Validates the login redirect response.
///
/// Assertions:
/// - The binding cookie carries the session id with the configured attributes.
/// - The provider URL carries the session id as `state` plus an S256 challenge.
/// - Exactly one session is stored.
#[tokio::test]
async fn test_login_sets_binding_cookie() {
    let app = test_app();
    let response = send(&app.router, get("/auth/login")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response).expect("Set-Cookie");
    let body = json_body(response).await;
    let session_id = body["session_id"].as_str().expect("session_id");

    assert_eq!(
        cookie,
        format!("session_id={session_id}; Path=/; Max-Age=600; SameSite=Strict; HttpOnly")
    );
    let login_url = body["login_url"].as_str().expect("login_url");
    assert!(login_url.contains(&format!("state={session_id}")));
    assert!(login_url.contains("code_challenge_method=S256"));
    assert_eq!(app.store.len(), 1);
}

/// Validates a complete login through the callback.
///
/// # Test Steps
/// 1. Start a login and keep the binding cookie.
/// 2. Call back with the matching state and cookie.
/// 3. Tokens and user come back, the cookie is cleared, the store is empty
///    and one login event carries the caller's address.
#[tokio::test]
async fn test_callback_completes_login() {
    let app = test_app();
    let (session_id, _) = begin_login(&app).await;

    let request = Request::get(callback_uri("abc", &session_id))
        .header(header::COOKIE, format!("session_id={session_id}"))
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::USER_AGENT, "integration-test")
        .body(Body::empty())
        .expect("request");
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).expect("Set-Cookie").contains("Max-Age=0"));
    let body = json_body(response).await;
    assert_eq!(body["access_token"], "access-abc");
    assert_eq!(body["refresh_token"], "refresh-abc");
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_in"].as_u64().is_some_and(|secs| secs > 3500));
    assert_eq!(body["user"]["sub"], "user-123");
    assert!(app.store.is_empty());

    let events = app.events.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        AuthEvent::UserLogin(login) => {
            assert_eq!(login.ip_address.as_deref(), Some("203.0.113.7"));
            assert_eq!(login.user_agent.as_deref(), Some("integration-test"));
            assert_eq!(login.provider, "mock");
        }
        other => panic!("expected login event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_replayed_callback_is_rejected() {
    let app = test_app();
    let (session_id, _) = begin_login(&app).await;
    let uri = callback_uri("abc", &session_id);

    let first = send(&app.router, get_with_cookie(&uri, &session_id)).await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = send(&app.router, get_with_cookie(&uri, &session_id)).await;
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(replay).await["error"], "Invalid or expired session");
    assert_eq!(app.identity.exchange_calls(), 1);
}

#[tokio::test]
async fn test_callback_without_cookie_keeps_session() {
    let app = test_app();
    let (session_id, _) = begin_login(&app).await;

    let response = send(&app.router, get(&callback_uri("abc", &session_id))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.consume_calls(), 0);
    let id = SessionId::parse(&session_id).expect("session id");
    assert!(app.store.peek(&id).is_some());
}

#[tokio::test]
async fn test_callback_with_foreign_cookie_is_rejected() {
    let app = test_app();
    let (victim, _) = begin_login(&app).await;
    let (attacker, _) = begin_login(&app).await;

    let request = get_with_cookie(&callback_uri("abc", &victim), &attacker);
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.len(), 2);
    assert_eq!(app.identity.exchange_calls(), 0);
}

#[tokio::test]
async fn test_callback_missing_parameters() {
    let app = test_app();
    let (session_id, _) = begin_login(&app).await;

    let uri = format!("/auth/callback?state={session_id}");
    let response = send(&app.router, get_with_cookie(&uri, &session_id)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Missing code or state");
    assert_eq!(app.store.len(), 1);
}

/// Validates a provider-side denial on the callback.
///
/// Assertions:
/// - Responds 400 and clears the binding cookie.
/// - The bound session is deleted and a cancellation event is published.
#[tokio::test]
async fn test_provider_error_cancels_session() {
    let app = test_app();
    let (session_id, _) = begin_login(&app).await;

    let uri = format!("/auth/callback?error=access_denied&state={session_id}");
    let response = send(&app.router, get_with_cookie(&uri, &session_id)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookie(&response).expect("Set-Cookie").contains("Max-Age=0"));
    assert_eq!(json_body(response).await["error"], "Authorization failed: access_denied");
    assert!(app.store.is_empty());
    assert!(matches!(
        app.events.events().as_slice(),
        [AuthEvent::UserLogout(logout)] if logout.reason == LogoutReason::LoginCancelled
    ));
}

#[tokio::test]
async fn test_exchange_failure_maps_to_bad_request() {
    let app = test_app();
    app.identity.fail_exchange_with(authbroker_domain::BrokerError::ExchangeFailed(
        "invalid_grant: code expired".into(),
    ));
    let (session_id, _) = begin_login(&app).await;

    let response =
        send(&app.router, get_with_cookie(&callback_uri("abc", &session_id), &session_id)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Failed to exchange authorization code");
    assert!(!body.to_string().contains("invalid_grant"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_exchange_maps_to_gateway_timeout() {
    let app = test_app_with(test_config(1));
    app.identity.delay_exchange(Duration::from_secs(5));
    let (session_id, _) = begin_login(&app).await;

    let response =
        send(&app.router, get_with_cookie(&callback_uri("abc", &session_id), &session_id)).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["retryable"], true);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_cancel_requires_cookie() {
    let app = test_app();
    let request = Request::delete("/auth/cancel").body(Body::empty()).expect("request");

    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No active session");
}

#[tokio::test]
async fn test_cancel_removes_session() {
    let app = test_app();
    let (session_id, _) = begin_login(&app).await;

    let request = Request::delete("/auth/cancel")
        .header(header::COOKIE, format!("session_id={session_id}"))
        .body(Body::empty())
        .expect("request");
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).expect("Set-Cookie").contains("Max-Age=0"));
    assert_eq!(json_body(response).await["message"], "Session cancelled");
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_session_status_reports_binding() {
    let app = test_app();

    let anonymous = json_body(send(&app.router, get("/auth/session")).await).await;
    assert_eq!(anonymous["valid"], false);
    assert!(anonymous.get("session_id").is_none());

    let (session_id, _) = begin_login(&app).await;
    let live =
        json_body(send(&app.router, get_with_cookie("/auth/session", &session_id)).await).await;
    assert_eq!(live["valid"], true);
    assert_eq!(live["session_id"], session_id.as_str());
    assert!(live["expires_in"].as_u64().is_some_and(|secs| secs <= 600));

    let id = SessionId::parse(&session_id).expect("session id");
    app.store.expire(&id);
    let expired =
        json_body(send(&app.router, get_with_cookie("/auth/session", &session_id)).await).await;
    assert_eq!(expired["valid"], false);
    assert!(expired.get("expires_in").is_none());
}

#[tokio::test]
async fn test_profile_requires_bearer_token() {
    let app = test_app();

    let missing = send(&app.router, get("/auth/profile")).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(missing).await["error"], "Missing or invalid authorization header");

    let basic = Request::get("/auth/profile")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .expect("request");
    let basic = send(&app.router, basic).await;
    assert_eq!(basic.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(basic).await["error"], "Invalid authorization header format");

    let unknown = Request::get("/auth/profile")
        .header(header::AUTHORIZATION, "Bearer not-issued")
        .body(Body::empty())
        .expect("request");
    let unknown = send(&app.router, unknown).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(unknown).await["error"], "Invalid token");
}

#[tokio::test]
async fn test_profile_returns_claims() {
    let app = test_app();
    app.identity.accept_token("good-token", sample_claims("user-9"));

    let request = Request::get("/auth/profile")
        .header(header::AUTHORIZATION, "Bearer good-token")
        .body(Body::empty())
        .expect("request");
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["sub"], "user-9");
    assert_eq!(body["user"]["displayName"], "Alice");
}

#[tokio::test]
async fn test_health_reflects_store() {
    let app = test_app();
    let healthy = send(&app.router, get("/health")).await;
    assert_eq!(healthy.status(), StatusCode::OK);
    assert_eq!(json_body(healthy).await["is_healthy"], true);

    let degraded = send(&app_with_store(Arc::new(FailingSessionStore)), get("/health")).await;
    assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(degraded).await;
    assert_eq!(body["is_healthy"], false);
    assert_eq!(body["components"][0]["name"], "session_store");
}

#[tokio::test]
async fn test_store_outage_on_login_is_service_unavailable() {
    let router = app_with_store(Arc::new(FailingSessionStore));

    let response = send(&router, get("/auth/login")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"], "Session storage temporarily unavailable");
}
