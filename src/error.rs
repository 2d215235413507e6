// Error handling for the ledger service
// Every workflow reports failures through LedgerError; handlers return it directly

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::store::StoreError;

/// Failure of a single workflow invocation
///
/// None of these are fatal to the process; each is scoped to the request
/// that produced it.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Missing or invalid input: unknown payment method, empty cart, non-positive amount
    /// Maps to HTTP 400 Bad Request
    #[error("{0}")]
    Validation(String),

    /// Request DTO failed declarative validation
    /// Maps to HTTP 400 Bad Request with field details
    #[error("Request validation failed")]
    InvalidRequest(validator::ValidationErrors),

    /// Balance-only payment larger than the stored balance
    /// Maps to HTTP 422 Unprocessable Entity
    #[error("Insufficient balance: current balance {balance}, required {required}")]
    InsufficientBalance { balance: Decimal, required: Decimal },

    /// Maps to HTTP 404 Not Found
    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// Duplicate data or a write that kept losing to concurrent writers
    /// Maps to HTTP 409 Conflict
    #[error("{0}")]
    Conflict(String),

    /// Store failure; the message is logged but never sent to clients
    /// Maps to HTTP 500 Internal Server Error
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::Validation(_) | LedgerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            LedgerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) | LedgerError::InvalidRequest(_) => "VALIDATION_ERROR",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::NotFound { .. } => "NOT_FOUND",
            LedgerError::Conflict(_) => "CONFLICT",
            LedgerError::Store(_) => "STORE_ERROR",
        }
    }

    /// Convert to status and JSON body, logging at a level matching the severity
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let details = match self {
            LedgerError::InvalidRequest(errors) => {
                debug!("Validation error: {:?}", errors);
                Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({})))
            }
            LedgerError::InsufficientBalance { balance, required } => {
                debug!("Insufficient balance: {} < {}", balance, required);
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required,
                }))
            }
            LedgerError::Conflict(message) => {
                warn!("Conflict error: {}", message);
                None
            }
            LedgerError::Store(message) => {
                error!("Store error: {}", message);
                None
            }
            other => {
                debug!("Request rejected: {}", other);
                None
            }
        };

        let message = match self {
            LedgerError::Store(_) => "A storage error occurred".to_string(),
            other => other.to_string(),
        };

        (
            self.status_code(),
            ErrorResponse {
                error_code: self.error_code().to_string(),
                message,
                details,
                timestamp: Utc::now().to_rfc3339(),
            },
        )
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "INSUFFICIENT_BALANCE")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_error_response();
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => LedgerError::not_found(entity, id),
            StoreError::Duplicate(what) => LedgerError::Conflict(format!("{} already exists", what)),
            StoreError::VersionConflict { member_id, .. } => LedgerError::Conflict(format!(
                "Member {} was modified concurrently, please retry",
                member_id
            )),
            StoreError::CheckViolation(what) => LedgerError::Store(what),
            StoreError::Database(db) => LedgerError::Store(db.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LedgerError::InvalidRequest(errors)
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
