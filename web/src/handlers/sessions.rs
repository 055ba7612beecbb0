//! Session ticket endpoints.
//!
//! ```text
//! POST /api/sessions          → 201 { code, expiresAt }
//! GET  /api/sessions/:code    → 200 { code, createdAt, expiresAt, payload }
//! ```

use crate::WebResult;
use crate::error::AppError;
use crate::middleware::CorrelationId;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use session_tickets_core::{SessionTicket, TicketStore, parse_expiry};

/// Body of `POST /api/sessions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// RFC 3339 expiry. Required; kept optional here so a missing value is
    /// reported like any other invalid expiry.
    #[serde(default)]
    pub expires_at: Option<String>,

    /// Opaque session metadata.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Body of a successful `POST /api/sessions`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Code to share with guests.
    pub code: String,
    /// When the code stops resolving.
    pub expires_at: DateTime<Utc>,
}

/// Body of a successful `GET /api/sessions/:code`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Canonical (uppercase) code.
    pub code: String,
    /// Allocation time.
    pub created_at: DateTime<Utc>,
    /// When the code stops resolving.
    pub expires_at: DateTime<Utc>,
    /// Metadata supplied at creation.
    pub payload: serde_json::Value,
}

impl From<SessionTicket> for SessionResponse {
    fn from(ticket: SessionTicket) -> Self {
        Self {
            code: ticket.code,
            created_at: ticket.created_at,
            expires_at: ticket.expires_at,
            payload: ticket.payload,
        }
    }
}

/// Allocate a session ticket.
///
/// # Errors
///
/// - 400 `VALIDATION_ERROR`: malformed body, or `expiresAt` missing,
///   unparseable, or not in the future
/// - 503 `CODE_SPACE_EXHAUSTED` with `Retry-After`: every attempt collided
/// - 503 `SERVICE_UNAVAILABLE`: store unreachable
/// - 500 `INTERNAL_SERVER_ERROR`: secure random source failed
pub async fn create_session<S>(
    State(state): State<AppState<S>>,
    correlation_id: CorrelationId,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> WebResult<(StatusCode, Json<CreateSessionResponse>)>
where
    S: TicketStore + 'static,
{
    let tag = |err: AppError| err.with_correlation_id(correlation_id);

    let Json(request) =
        body.map_err(|rejection| tag(AppError::validation(rejection.body_text())))?;
    let expires_at = parse_expiry(request.expires_at.as_deref()).map_err(|e| tag(e.into()))?;
    let ticket = state
        .allocator
        .allocate(expires_at, request.payload)
        .await
        .map_err(|e| tag(e.into()))?;

    tracing::info!(
        correlation_id = %correlation_id,
        code = %ticket.code,
        expires_at = %ticket.expires_at,
        "Session ticket issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            code: ticket.code,
            expires_at: ticket.expires_at,
        }),
    ))
}

/// Look up a live session by the code a guest typed.
///
/// # Errors
///
/// - 400 `VALIDATION_ERROR`: code has the wrong length or symbols
/// - 404 `NOT_FOUND`: no live session holds the code
/// - 503 `SERVICE_UNAVAILABLE`: store unreachable
pub async fn get_session<S>(
    State(state): State<AppState<S>>,
    correlation_id: CorrelationId,
    Path(code): Path<String>,
) -> WebResult<Json<SessionResponse>>
where
    S: TicketStore + 'static,
{
    let ticket = state
        .resolver
        .resolve(&code)
        .await
        .map_err(|e| AppError::from(e).with_correlation_id(correlation_id))?;

    tracing::debug!(correlation_id = %correlation_id, code = %ticket.code, "Session ticket resolved");
    Ok(Json(SessionResponse::from(ticket)))
}
