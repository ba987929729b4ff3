//! Unified error handling for the HTTP layer.
//!
//! Provides a unified `AppError` type that maps pipeline errors onto HTTP
//! status codes and JSON bodies. All route handlers should return
//! `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use limoda_checkout::CheckoutError;
use limoda_checkout::clients::{LookupError, PaymentError};
use limoda_checkout::inventory::StockShortfall;
use limoda_checkout::store::StoreError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout pipeline operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message, safe to show to the client.
    pub error: String,
    /// Per-line stock shortfalls, present only on oversell conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfalls: Option<Vec<StockShortfall>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server-side faults; client errors are the caller's problem
        if matches!(
            self,
            Self::Internal(_)
                | Self::Checkout(
                    CheckoutError::Store(_)
                        | CheckoutError::Flow(_)
                        | CheckoutError::Payment(_)
                        | CheckoutError::Lookup(_)
                )
        ) {
            tracing::error!(error = %self, "Request error");
        }

        let status = match &self {
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_) | CheckoutError::Coupon(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CheckoutError::Lookup(LookupError::NotFound(_)) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::Lookup(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::InsufficientStock { .. } | CheckoutError::CommitConflict { .. } => {
                    StatusCode::CONFLICT
                }
                CheckoutError::Payment(PaymentError::Declined { .. }) => {
                    StatusCode::PAYMENT_REQUIRED
                }
                CheckoutError::Payment(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::Store(_) | CheckoutError::Flow(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Checkout(err) => match err {
                CheckoutError::Store(_) | CheckoutError::Flow(_) => {
                    "Internal server error".to_string()
                }
                CheckoutError::Payment(PaymentError::Declined { reason }) => {
                    format!("payment declined: {reason}")
                }
                CheckoutError::Payment(_) => "Payment service error".to_string(),
                CheckoutError::Lookup(LookupError::NotFound(cep)) => {
                    format!("CEP not found: {cep}")
                }
                CheckoutError::Lookup(_) => "Address lookup error".to_string(),
                other => other.to_string(),
            },
            other => other.to_string(),
        };

        let shortfalls = match self {
            Self::Checkout(CheckoutError::InsufficientStock { shortfalls }) => Some(shortfalls),
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                shortfalls,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Checkout(err.into())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
