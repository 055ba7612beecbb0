//! Router assembly.

use crate::handlers::{create_session, get_session, health_check, readiness_check};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use session_tickets_core::TicketStore;
use tower_http::trace::TraceLayer;

/// Build the HTTP router.
///
/// ```text
/// POST /api/sessions
/// GET  /api/sessions/:code
/// GET  /health
/// GET  /ready
/// ```
///
/// Every route is traced and carries an `X-Correlation-ID` response header.
pub fn build_router<S>(state: AppState<S>) -> Router
where
    S: TicketStore + 'static,
{
    Router::new()
        .route("/api/sessions", post(create_session::<S>))
        .route("/api/sessions/:code", get(get_session::<S>))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}
