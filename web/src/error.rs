//! Error types for web handlers.
//!
//! This module bridges [`TicketError`] and HTTP responses, implementing
//! Axum's `IntoResponse` trait. Clients get a stable `code` and a
//! user-facing `message`; store and entropy details stay in the logs.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use crate::middleware::CorrelationId;
use serde::Serialize;
use session_tickets_core::TicketError;
use std::fmt;

/// Message returned for transient infrastructure failures.
const UNAVAILABLE_MESSAGE: &str = "service temporarily unavailable, try again later";

/// Message returned for internal failures.
const INTERNAL_MESSAGE: &str = "an internal error occurred";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use session_tickets_core::TicketError;
/// use session_tickets_web::AppError;
///
/// let err = AppError::from(TicketError::Exhausted { attempts: 8 });
/// assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
/// assert_eq!(err.code(), "CODE_SPACE_EXHAUSTED");
/// assert_eq!(err.retry_after(), Some(1));
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Seconds for the `Retry-After` header
    retry_after: Option<u64>,
    /// Request the error belongs to
    correlation_id: Option<CorrelationId>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            retry_after: None,
            correlation_id: None,
            source: None,
        }
    }

    /// Tag the error with the request it belongs to.
    #[must_use]
    pub const fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Attach the internal cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Ask the client to retry after `seconds`.
    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Create a 400 Bad Request error for invalid input.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            message.into(),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 503 error for an exhausted code space.
    #[must_use]
    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "CODE_SPACE_EXHAUSTED".to_string(),
        )
        .with_retry_after(1)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `Retry-After` seconds, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        self.retry_after
    }

    /// Correlation ID, if the handler attached one.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Echo of `X-Correlation-ID` for support requests.
    #[serde(rename = "correlationId", skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                correlation_id = self.correlation_id.map(tracing::field::display),
                error = self.source.as_ref().map(tracing::field::display),
                "Request failed"
            );
        }

        let retry_after = self.retry_after;
        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            correlation_id: self.correlation_id.map(|id| id.to_string()),
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<TicketError> for AppError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::Validation(message) => Self::validation(message),
            TicketError::NotFound => Self::not_found(err.to_string()),
            TicketError::Exhausted { .. } => Self::exhausted(err.to_string()),
            TicketError::StoreUnavailable(_) => {
                Self::unavailable(UNAVAILABLE_MESSAGE).with_source(anyhow::Error::new(err))
            }
            TicketError::Entropy(_) | TicketError::Config(_) => {
                Self::internal(INTERNAL_MESSAGE).with_source(anyhow::Error::new(err))
            }
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(INTERNAL_MESSAGE).with_source(err)
    }
}
