//! Conversions from external infrastructure errors into domain errors.

use authbroker_domain::BrokerError;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use serde_json::Error as JsonError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BrokerError);

impl From<InfraError> for BrokerError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BrokerError> for InfraError {
    fn from(value: BrokerError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBrokerError {
    fn into_broker(self) -> BrokerError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → BrokerError */
/* -------------------------------------------------------------------------- */

impl IntoBrokerError for SqlError {
    fn into_broker(self) -> BrokerError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => {
                        BrokerError::StoreUnavailable("session database is busy".into())
                    }
                    ErrorCode::DatabaseLocked => {
                        BrokerError::StoreUnavailable("session database is locked".into())
                    }
                    ErrorCode::CannotOpen => {
                        BrokerError::StoreUnavailable("session database cannot be opened".into())
                    }
                    _ => BrokerError::StoreUnavailable(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => BrokerError::SessionNotFound,
            RE::FromSqlConversionFailure(_, _, cause) => {
                BrokerError::Internal(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                BrokerError::Internal(format!("invalid column type: {ty}"))
            }
            other => BrokerError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_broker())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → BrokerError */
/* -------------------------------------------------------------------------- */

impl IntoBrokerError for PoolError {
    fn into_broker(self) -> BrokerError {
        BrokerError::StoreUnavailable(format!("connection pool: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_broker())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → BrokerError */
/* -------------------------------------------------------------------------- */

impl IntoBrokerError for JsonError {
    fn into_broker(self) -> BrokerError {
        BrokerError::Internal(format!("undecodable session payload: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_broker())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BrokerError */
/* -------------------------------------------------------------------------- */

impl IntoBrokerError for HttpError {
    fn into_broker(self) -> BrokerError {
        if self.is_connect() {
            return BrokerError::ExchangeFailed("identity provider unreachable".into());
        }

        if let Some(status) = self.status() {
            return BrokerError::ExchangeFailed(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }

        if self.is_decode() {
            return BrokerError::ExchangeFailed("unreadable token endpoint response".into());
        }

        BrokerError::ExchangeFailed(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_broker())
    }
}

/* -------------------------------------------------------------------------- */
/* jsonwebtoken::errors::Error → BrokerError */
/* -------------------------------------------------------------------------- */

impl IntoBrokerError for JwtError {
    fn into_broker(self) -> BrokerError {
        let reason = match self.kind() {
            JwtErrorKind::ExpiredSignature => "token expired",
            JwtErrorKind::ImmatureSignature => "token not yet valid",
            JwtErrorKind::InvalidSignature => "signature mismatch",
            JwtErrorKind::InvalidIssuer => "unexpected issuer",
            JwtErrorKind::InvalidAudience => "unexpected audience",
            JwtErrorKind::InvalidAlgorithm => "algorithm not accepted",
            JwtErrorKind::MissingRequiredClaim(_) => "required claim missing",
            JwtErrorKind::InvalidToken | JwtErrorKind::Base64(_) | JwtErrorKind::Json(_) => {
                "malformed token"
            }
            JwtErrorKind::InvalidRsaKey(_) | JwtErrorKind::InvalidKeyFormat => {
                return BrokerError::Config(format!("token verification key rejected: {self}"));
            }
            _ => "verification failed",
        };
        BrokerError::InvalidToken(reason.to_string())
    }
}

impl From<JwtError> for InfraError {
    fn from(value: JwtError) -> Self {
        InfraError(value.into_broker())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → BrokerError */
/* -------------------------------------------------------------------------- */

pub(crate) fn map_join_error(err: JoinError) -> BrokerError {
    if err.is_cancelled() {
        BrokerError::Internal("blocking task cancelled".into())
    } else {
        BrokerError::Internal(format!("blocking task failed: {err}"))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
