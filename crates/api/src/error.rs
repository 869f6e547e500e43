//! API error types with HTTP response mapping.

use allocation::AllocationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger::LedgerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unknown vendor identity.
    Unauthorized(String),
    /// Allocation engine error.
    Allocation(AllocationError),
    /// Ledger error from a vendor inventory edit.
    Ledger(LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Allocation(err) => allocation_error_to_response(err),
            ApiError::Ledger(err) => ledger_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn allocation_error_to_response(err: AllocationError) -> (StatusCode, String) {
    match err {
        AllocationError::Ledger(inner) => ledger_error_to_response(inner),
        AllocationError::ProductNotFound(_) | AllocationError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        AllocationError::NoStockAvailable { .. } | AllocationError::InvalidQuantity => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, String) {
    match &err {
        LedgerError::RecordNotFound { .. }
        | LedgerError::ProductNotFound(_)
        | LedgerError::VendorNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        LedgerError::InvalidPrice(_) | LedgerError::InvalidStock(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        LedgerError::AlreadyEnrolled { .. }
        | LedgerError::InsufficientStock { .. }
        | LedgerError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        LedgerError::Database(_) | LedgerError::Migration(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        ApiError::Allocation(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}
