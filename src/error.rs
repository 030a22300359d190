//! Unified error handling for the integrations API.
//!
//! Protocol modules define their own `thiserror` enums; at the handler
//! boundary everything is translated into an [`ApiError`] rendered as
//! `application/problem+json`. Browser-facing callback routes are the one
//! exception: they convert failures into redirects instead (see
//! `handlers::callback`).

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::telemetry;

/// Problem-style error payload returned by every non-callback route.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// Response status, not serialized into the body
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Stable machine-readable code, SCREAMING_SNAKE_CASE
    pub code: Box<str>,
    /// Human-readable description of what went wrong
    pub message: Box<str>,
    /// Structured context for the error, when any exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation id clients can quote when reporting problems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        let trace_id = telemetry::current_trace_id()
            .unwrap_or_else(|| format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]));

        Self {
            status,
            code: Box::from(code),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Some(trace_id.into_boxed_str()),
        }
    }

    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );
        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("internal error: {:?}", error);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(cause) => {
                tracing::error!("database connection error: {:?}", cause);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// 502 for an upstream provider failure, carrying a truncated body snippet.
pub fn provider_error(provider: &str, status: u16, body: Option<String>) -> ApiError {
    let snippet = body.map(|b| match b.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &b[..cut]),
        None => b,
    });

    ApiError::new(
        StatusCode::BAD_GATEWAY,
        "PROVIDER_ERROR",
        format!("Provider {} returned error status {}", provider, status),
    )
    .with_details(json!({
        "provider": provider,
        "status": status,
        "body_snippet": snippet,
    }))
}

pub fn unauthorized(message: Option<&str>) -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        message.unwrap_or("Authentication required"),
    )
}

pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

/// 503 for a deployment missing the configuration a feature needs.
pub fn not_configured(message: &str) -> ApiError {
    ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_populates_trace_id() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test message");
        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test message"));
        assert!(error.trace_id.is_some());
    }

    #[test]
    fn test_response_uses_problem_json() {
        let response =
            ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test error").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_provider_error_truncates_body() {
        let error = provider_error("google", 500, Some("x".repeat(500)));
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(error.code, Box::from("PROVIDER_ERROR"));

        let details = error.details.unwrap();
        let snippet = details.get("body_snippet").and_then(|v| v.as_str()).unwrap();
        assert_eq!(snippet.chars().count(), 203);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_db_error_mapping() {
        let api_error: ApiError = sea_orm::DbErr::RecordNotFound("token".to_string()).into();
        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert!(api_error.message.contains("token"));
    }

    #[test]
    fn test_not_configured_helper() {
        let error = not_configured("Google Calendar is not configured");
        assert_eq!(error.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.code, Box::from("NOT_CONFIGURED"));
    }
}
