//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing or invalid JWT / API key, wrong role
/// - **Resource Errors**: Requested resources not found
/// - **Business Logic Errors**: Operations that violate business rules
/// - **Validation Errors**: Invalid request data
/// - **Upstream Errors**: Bank APIs or webhook receivers misbehaving
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Credentials are missing, invalid, expired or revoked.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid or missing credentials")]
    Unauthorized,

    /// Authenticated, but the role does not allow the operation.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Operation requires the {0} role")]
    Forbidden(&'static str),

    /// Resource does not exist or belongs to another organization.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook URL failed validation.
    #[error("Invalid webhook URL: {0}")]
    InvalidWebhookUrl(String),

    /// Inbound webhook signature did not verify.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid signature")]
    InvalidSignature,

    /// A business rule rejected an otherwise well-formed request.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("{0}")]
    Domain(String),

    /// A bank API or webhook receiver failed.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database, HTTP client and internal errors are logged and replaced by a
/// generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::InvalidWebhookUrl(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_webhook_url", msg.clone())
            }
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                self.to_string(),
            ),
            AppError::Domain(ref msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "domain_error", msg.clone())
            }
            AppError::Upstream(ref msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg.clone()),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Http(ref e) => {
                tracing::error!("HTTP client error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "An upstream service failed".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
