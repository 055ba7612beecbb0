//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use session_tickets_core::TicketStore;

/// Liveness check.
///
/// Returns 200 OK to indicate the process is running. Does NOT check the store.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness check.
///
/// Pings the ticket store.
///
/// # Status Codes
///
/// - 200 OK: store reachable
/// - 503 Service Unavailable: store unreachable
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check<S>(State(state): State<AppState<S>>) -> (StatusCode, &'static str)
where
    S: TicketStore + 'static,
{
    match state.allocator.store().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed: store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}
