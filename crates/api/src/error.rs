//! HTTP error mapping
//!
//! Detailed causes are logged here; response bodies carry only a generic
//! `{"error": "..."}` message, plus `"retryable": true` when starting a new
//! login may succeed.

use authbroker_domain::BrokerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl ApiError {
    /// Status code for a broker failure
    pub fn status_for(err: &BrokerError) -> StatusCode {
        match err {
            BrokerError::MalformedRequest(_)
            | BrokerError::SessionNotFound
            | BrokerError::ExchangeFailed(_) => StatusCode::BAD_REQUEST,
            BrokerError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            BrokerError::ExchangeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            BrokerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BrokerError::Config(_) | BrokerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, false),
            // Validation text carries no secrets
            ApiError::Broker(BrokerError::MalformedRequest(msg)) => {
                (StatusCode::BAD_REQUEST, msg, false)
            }
            ApiError::Broker(err) => {
                let status = Self::status_for(&err);
                if status.is_server_error() {
                    error!(error = %err, status = status.as_u16(), "Request failed");
                } else {
                    warn!(error = %err, status = status.as_u16(), "Request rejected");
                }
                (status, err.public_message().to_string(), err.is_retryable())
            }
        };

        let body = if retryable {
            serde_json::json!({ "error": message, "retryable": true })
        } else {
            serde_json::json!({ "error": message })
        };
        (status, Json(body)).into_response()
    }
}
