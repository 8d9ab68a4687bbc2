//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::LedgerError;
use crate::event_store::EventStoreError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    #[error("Invalid caller identity: {0}")]
    InvalidCallerId(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] LedgerError),

    // Server errors (5xx)
    #[error(transparent)]
    EventStore(#[from] EventStoreError),
}

impl AppError {
    /// The domain error behind this failure, if any
    pub fn as_ledger_error(&self) -> Option<&LedgerError> {
        match self {
            AppError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.clone()))
            }
            AppError::InvalidCallerId(value) => {
                (StatusCode::BAD_REQUEST, "invalid_caller_id", Some(value.clone()))
            }

            // 404 Not Found
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
            }

            // 409 Conflict
            AppError::AccountAlreadyExists(id) => {
                (StatusCode::CONFLICT, "account_already_exists", Some(id.clone()))
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => match domain_err {
                LedgerError::Unauthorized { .. } => {
                    (StatusCode::FORBIDDEN, "unauthorized", Some(domain_err.to_string()))
                }
                LedgerError::InsufficientBalance { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_balance", Some(domain_err.to_string()))
                }
                LedgerError::InvalidAmount(err) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(err.to_string()))
                }
                LedgerError::ArithmeticOverflow { .. } => {
                    tracing::error!("Arithmetic overflow: {}", domain_err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "arithmetic_overflow", None)
                }
                LedgerError::InvariantViolation(msg) => {
                    tracing::error!("Invariant violation: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "invariant_violation", None)
                }
            },

            // 409 / 500 from the store
            AppError::EventStore(store_err) => match store_err {
                EventStoreError::ConcurrencyConflict { .. } | EventStoreError::MaxRetriesExceeded => {
                    (StatusCode::CONFLICT, "version_conflict", None)
                }
                other => {
                    tracing::error!("Event store error: {:?}", other);
                    (StatusCode::INTERNAL_SERVER_ERROR, "event_store_error", None)
                }
            },
        };

        // Internal details stay in the log
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
