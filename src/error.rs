//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! An insufficient balance on `deduct_credits` is *not* an error (it is
//! `Ok(false)`); the variant below is only raised by the orchestrator when
//! it refuses a request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::generator::GenerationError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2003,
///     "message": "payment already recorded: 42_1700000000",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                      |
/// |-----------|-----------------|----------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                  |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict     |
/// | 3000–3999 | Server          | 500 / 503                        |
/// | 4000–4999 | Ledger/Provider | 402 / 422 / 429 / 502            |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A credit amount was zero or negative.
    #[error("invalid credit amount: {0} (must be positive)")]
    InvalidAmount(i64),

    /// No account exists for the given platform user id.
    #[error("user not found: {0}")]
    UserNotFound(i64),

    /// Unknown credit package key.
    #[error("package not found: {0}")]
    PackageNotFound(String),

    /// The payment identifier was already recorded.
    #[error("payment already recorded: {0}")]
    DuplicatePayment(String),

    /// The account cannot pay for the requested generation.
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance {
        /// Balance at the time of the check.
        balance: i64,
        /// Credits required.
        required: i64,
    },

    /// The external image generator failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Persistence layer failure (connection lost, pool exhausted, query
    /// failure). Retryable.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidAmount(_) => 1002,
            Self::UserNotFound(_) => 2001,
            Self::PackageNotFound(_) => 2002,
            Self::DuplicatePayment(_) => 2003,
            Self::InsufficientBalance { .. } => 4001,
            Self::Generation(GenerationError::ContentPolicy(_)) => 4002,
            Self::Generation(GenerationError::RateLimited) => 4003,
            Self::Generation(GenerationError::Failed(_)) => 4004,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::PackageNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicatePayment(_) => StatusCode::CONFLICT,
            Self::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::Generation(GenerationError::ContentPolicy(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Generation(GenerationError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            Self::Generation(GenerationError::Failed(_)) => StatusCode::BAD_GATEWAY,
            Self::PersistenceError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wraps a store failure as a [`GatewayError::PersistenceError`].
    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let details = match &self {
            Self::Generation(err) => Some(err.user_message()),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
