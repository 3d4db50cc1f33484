//! Application Error Types
//!
//! Centralized error handling with Axum integration. Every error renders the
//! same envelope as successful responses, with a machine-readable code in
//! `error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::response::ApiResponse;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Rate limited")]
    RateLimited { retry_after: u64 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl AppError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: message.into(),
        }
    }

    /// 403 returned by every ownership or visibility check.
    pub fn access_denied() -> Self {
        Self::forbidden("ACCESS_DENIED", "Access denied")
    }

    /// 401 returned when a handler needs an identity and none was resolved.
    pub fn not_authenticated() -> Self {
        Self::unauthorized("NOT_AUTHENTICATED", "Authentication required")
    }

    /// Single-field validation failure.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Database(_) | AppError::Redis(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code placed in the envelope's `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { code, .. }
            | AppError::BadRequest { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::Forbidden { code, .. } => *code,
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::Internal(_) | AppError::Database(_) | AppError::Redis(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            AppError::Validation(errors) => {
                let message = errors
                    .first()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .unwrap_or_else(|| "Validation failed".into());
                ApiResponse::failure(code, message).with_details(serde_json::json!(errors))
            }
            AppError::RateLimited { retry_after } => ApiResponse::failure(
                code,
                "Too many requests, please try again later",
            )
            .with_details(serde_json::json!({ "retryAfter": retry_after })),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiResponse::failure(code, "Internal server error")
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                ApiResponse::failure(code, "Internal server error")
            }
            AppError::Redis(e) => {
                tracing::error!(error = %e, "Redis error");
                ApiResponse::failure(code, "Internal server error")
            }
            AppError::NotFound { message, .. }
            | AppError::BadRequest { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::Forbidden { message, .. } => ApiResponse::failure(code, message),
        };

        (status, body).into_response()
    }
}
