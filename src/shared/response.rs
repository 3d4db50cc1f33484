//! Response Envelope
//!
//! Uniform `{success, message?, data?, error?, details?, timestamp}` wrapper
//! returned by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

/// JSON envelope around every response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = serde_json::Value> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the response was produced
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Attach a human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<serde_json::Value> {
    /// Successful response with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Failure response with an error code.
    pub fn failure(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error: Some(code),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Attach structured details (field violations, retry information).
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `201 Created` with the envelope.
pub fn created<T: Serialize>(data: T, message: &str) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, ApiResponse::ok(data).with_message(message))
}
