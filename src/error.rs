//! Application-level error type and its HTTP mapping.
//!
//! Every handler returns `AppError`; the `IntoResponse` impl turns it into
//! the standardized JSON error envelope clients see.

use crate::database::StoreError;
use crate::payments::PaymentError;
use crate::services::ReconciliationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error code exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Conflict,
    ProviderError,
    Unauthorized,
    ServiceUnavailable,
    InternalError,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Store(StoreError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Payment(e) => {
                StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::DuplicateReference(_)) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::Payment(PaymentError::Validation { .. }) => ErrorCode::ValidationError,
            AppError::Payment(PaymentError::UnsupportedOperation { .. }) => {
                ErrorCode::ValidationError
            }
            AppError::Payment(PaymentError::Network { .. }) => ErrorCode::ServiceUnavailable,
            AppError::Payment(_) => ErrorCode::ProviderError,
            AppError::Store(StoreError::NotFound) => ErrorCode::NotFound,
            AppError::Store(StoreError::DuplicateReference(_)) => ErrorCode::Conflict,
            AppError::Store(_) => ErrorCode::InternalError,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::Payment(e) => e.user_message(),
            AppError::Store(StoreError::NotFound) => "Order not found".to_string(),
            AppError::Store(StoreError::DuplicateReference(r)) => {
                format!("An order with reference {} already exists", r)
            }
            AppError::Store(_) | AppError::Internal(_) => {
                "An internal server error occurred. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Payment(e) => e.is_retryable(),
            AppError::Store(StoreError::Database(_)) => true,
            _ => false,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<ReconciliationError> for AppError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::OrderNotFound(id) => {
                AppError::NotFound(format!("order {} not found", id))
            }
            ReconciliationError::Payment(e) => AppError::Payment(e),
            ReconciliationError::Store(e) => AppError::Store(e),
        }
    }
}

/// Standardized error response structure returned for all error cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            error: error.error_code(),
            message: error.user_message(),
            timestamp: Utc::now().to_rfc3339(),
            retryable: Some(error.is_retryable()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, status = %status.as_u16(), "Server error occurred");
        } else {
            tracing::warn!(error = ?self, status = %status.as_u16(), "Client error occurred");
        }

        (status, Json(ErrorResponse::from_app_error(&self))).into_response()
    }
}
