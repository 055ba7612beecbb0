//! Axum HTTP surface for session tickets.
//!
//! Thin shell over [`session_tickets_core`]: handlers parse the request,
//! call the allocator or resolver, and map [`TicketError`](session_tickets_core::TicketError)
//! to an [`AppError`] response.
//!
//! # Request Flow
//!
//! 1. **Correlation ID** is read from `X-Correlation-ID` or generated
//! 2. **Extract** JSON body or path code
//! 3. **Validate** expiry or code format (400 on failure, store untouched)
//! 4. **Allocate / resolve** through the core
//! 5. **Map result** to HTTP response; error bodies echo the correlation ID
//!
//! # Example
//!
//! ```ignore
//! use session_tickets_core::{AllocatorConfig, TicketAllocator};
//! use session_tickets_web::{AppState, build_router};
//!
//! let allocator = TicketAllocator::new(store, AllocatorConfig::default())?;
//! let app = build_router(AppState::new(allocator));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use handlers::sessions::{CreateSessionRequest, CreateSessionResponse, SessionResponse};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
