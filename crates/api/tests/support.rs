//! Shared fixtures for HTTP tests: the real router over mock adapters.

#![allow(dead_code)]

use std::sync::Arc;

use authbroker_api::{router, AppContext};
use authbroker_core::testing::{MockIdentityProvider, MockSessionStore, RecordingEventPublisher};
use authbroker_core::SessionStore;
use authbroker_domain::BrokerConfig;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Router plus handles on the adapters behind it
pub struct TestApp {
    pub router: Router,
    pub store: MockSessionStore,
    pub identity: MockIdentityProvider,
    pub events: RecordingEventPublisher,
}

pub fn test_config(exchange_timeout_secs: u64) -> BrokerConfig {
    serde_json::from_value(json!({
        "identity_provider": {
            "base_url": "https://idp.test",
            "client_id": "broker-client",
            "redirect_uri": "https://app.test/auth/callback",
            "exchange_timeout_secs": exchange_timeout_secs,
            "token": { "algorithm": "HS256", "secret": "unused" }
        }
    }))
    .expect("valid test config")
}

pub fn test_app() -> TestApp {
    test_app_with(test_config(10))
}

pub fn test_app_with(config: BrokerConfig) -> TestApp {
    let store = MockSessionStore::new();
    let identity = MockIdentityProvider::new();
    let events = RecordingEventPublisher::new();

    let ctx = AppContext::from_parts(
        config,
        Arc::new(store.clone()),
        Arc::new(identity.clone()),
        Arc::new(events.clone()),
    );

    TestApp { router: router(Arc::new(ctx)), store, identity, events }
}

/// Router over an arbitrary store, for failure scenarios
pub fn app_with_store(store: Arc<dyn SessionStore>) -> Router {
    let ctx = AppContext::from_parts(
        test_config(10),
        store,
        Arc::new(MockIdentityProvider::new()),
        Arc::new(RecordingEventPublisher::new()),
    );
    router(Arc::new(ctx))
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.expect("router is infallible")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

pub fn get_with_cookie(uri: &str, session_id: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, format!("session_id={session_id}"))
        .body(Body::empty())
        .expect("request")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Start a login and return `(session_id, login_url)`
pub async fn begin_login(app: &TestApp) -> (String, String) {
    let response = send(&app.router, get("/auth/login")).await;
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    (
        body["session_id"].as_str().expect("session_id").to_string(),
        body["login_url"].as_str().expect("login_url").to_string(),
    )
}
