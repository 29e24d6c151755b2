//! `/auth/*` handlers
//!
//! Thin adapters: read the binding cookie and request headers, call the
//! orchestrator, shape JSON and cookies.

use std::sync::Arc;

use authbroker_core::CallbackRequest;
use authbroker_domain::UserClaims;
use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::utils::client::client_context;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub login_url: String,
    pub session_id: String,
}

/// Provider redirect parameters
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user denied consent or the request failed
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub user: UserClaims,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Seconds left on the login attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserClaims,
}

/// `GET /auth/login`
pub async fn login(State(ctx): State<Arc<AppContext>>) -> ApiResult<Response> {
    let start = ctx.orchestrator.begin_login().await?;
    let session_id = start.session_id.to_string();
    let cookie = ctx.cookie.issue(&session_id, start.expires_in)?;

    let body = LoginResponse { login_url: start.authorization_url, session_id };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// `GET /auth/callback`
pub async fn callback(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let binding = ctx.cookie.read(&headers);

    if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
        info!(
            provider_error = error,
            description = params.error_description.as_deref().unwrap_or_default(),
            "Provider returned an authorization error"
        );
        if binding.is_some() {
            if let Err(err) = ctx.orchestrator.cancel_login(binding.as_deref()).await {
                warn!(error = %err, "Failed to cancel session after provider error");
            }
        }
        let body = serde_json::json!({ "error": format!("Authorization failed: {error}") });
        return Ok(
            (StatusCode::BAD_REQUEST, [(SET_COOKIE, ctx.cookie.clear()?)], Json(body))
                .into_response(),
        );
    }

    let (Some(code), Some(state)) = (non_empty(params.code), non_empty(params.state)) else {
        return Err(ApiError::BadRequest("Missing code or state".into()));
    };

    let outcome = ctx
        .orchestrator
        .complete_login(CallbackRequest { code, state, binding, client: client_context(&headers) })
        .await?;

    let body = CallbackResponse {
        expires_in: outcome.tokens.expires_in(Utc::now()),
        expires_at: outcome.tokens.expires_at,
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        token_type: outcome.tokens.token_type,
        user: outcome.user,
    };
    Ok(([(SET_COOKIE, ctx.cookie.clear()?)], Json(body)).into_response())
}

/// `DELETE /auth/cancel`
pub async fn cancel(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let binding = ctx.cookie.read(&headers);
    ctx.orchestrator.cancel_login(binding.as_deref()).await?;

    let body = MessageResponse { message: "Session cancelled".into() };
    Ok(([(SET_COOKIE, ctx.cookie.clear()?)], Json(body)).into_response())
}

/// `GET /auth/session`
pub async fn session_status(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Json<SessionStatusResponse> {
    let Some(session_id) = ctx.cookie.read(&headers) else {
        return Json(SessionStatusResponse { valid: false, session_id: None, expires_in: None });
    };

    let valid = ctx.orchestrator.check_session(Some(&session_id)).await;
    let expires_in = if valid {
        ctx.orchestrator.session_expires_in(Some(&session_id)).await.map(|ttl| ttl.as_secs())
    } else {
        None
    };

    Json(SessionStatusResponse { valid, session_id: Some(session_id), expires_in })
}

/// `GET /auth/profile`
pub async fn profile(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> ApiResult<Json<ProfileResponse>> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| value.len() > "Bearer ".len())
        .ok_or_else(|| ApiError::Unauthorized("Missing or invalid authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header format".into()))?;

    let user = ctx.orchestrator.parse_user(token).await?;
    Ok(Json(ProfileResponse { user }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
