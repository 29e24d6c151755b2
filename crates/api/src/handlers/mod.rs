//! HTTP handlers and routing

pub mod auth;
pub mod health;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::context::AppContext;

/// Routes under `/auth`
pub fn auth_routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/cancel", delete(auth::cancel))
        .route("/auth/session", get(auth::session_status))
        .route("/auth/profile", get(auth::profile))
}

/// Full application router with tracing and optional CORS
pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config.server.allowed_origins);

    let router = Router::new()
        .route("/health", get(health::health))
        .merge(auth_routes())
        .with_state(ctx)
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Credentialed CORS for an explicit origin list; `None` when the list is empty
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
    )
}
