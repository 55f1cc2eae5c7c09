//! Ledger error types with HTTP status code mapping.
//!
//! [`LedgerError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "price unavailable for symbol TCS",
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
    /// Numeric error code (see [`LedgerError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Service error enum with HTTP status code mapping.
///
/// A replayed `event_id` is not represented here: it is a success outcome
/// of reward processing, not an error.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | Not Found       | 404 Not Found                |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 4000–4999 | Business rule   | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed or missing request fields, non-positive quantity,
    /// negative fee inputs.
    #[error("invalid request: {0}")]
    Validation(String),

    /// No price snapshot exists for the symbol at processing time, so the
    /// reward cannot be valued.
    #[error("price unavailable for symbol {0}")]
    PriceUnavailable(String),

    /// Read-path lookup of a symbol's price found nothing.
    #[error("no price recorded for symbol {0}")]
    PriceNotFound(String),

    /// No reward event with the given idempotency key.
    #[error("reward event not found: {0}")]
    EventNotFound(uuid::Uuid),

    /// Persistence layer failure other than "not found".
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Debits and credits of a ledger batch disagree. Always a defect.
    #[error("ledger imbalance: debit={debit}, credit={credit}")]
    LedgerImbalance {
        /// Sum of debit amounts.
        debit: Decimal,
        /// Sum of credit amounts.
        credit: Decimal,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::EventNotFound(_) => 2001,
            Self::PriceNotFound(_) => 2002,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::LedgerImbalance { .. } => 3002,
            Self::PriceUnavailable(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::EventNotFound(_) | Self::PriceNotFound(_) => StatusCode::NOT_FOUND,
            Self::PriceUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Persistence(_) | Self::LedgerImbalance { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Wraps any displayable storage error as [`LedgerError::Persistence`].
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn codes_follow_ranges() {
        assert_eq!(LedgerError::Validation("x".into()).error_code(), 1001);
        assert_eq!(LedgerError::EventNotFound(uuid::Uuid::nil()).error_code(), 2001);
        assert_eq!(LedgerError::Persistence("db".into()).error_code(), 3001);
        assert_eq!(LedgerError::PriceUnavailable("TCS".into()).error_code(), 4001);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            LedgerError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::PriceNotFound("TCS".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LedgerError::PriceUnavailable("TCS".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let imbalance = LedgerError::LedgerImbalance {
            debit: dec!(10),
            credit: dec!(9),
        };
        assert_eq!(imbalance.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(imbalance.to_string(), "ledger imbalance: debit=10, credit=9");
    }

    #[test]
    fn into_response_sets_status() {
        let response = LedgerError::PriceNotFound("INFY".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
