//! Application state for Axum handlers.

use session_tickets_core::{TicketAllocator, TicketResolver, TicketStore};
use std::sync::Arc;

/// Shared allocator and resolver, both backed by the same store.
pub struct AppState<S> {
    /// Issues new tickets.
    pub allocator: Arc<TicketAllocator<S>>,
    /// Looks up tickets by code.
    pub resolver: Arc<TicketResolver<S>>,
}

impl<S: TicketStore + Clone> AppState<S> {
    /// Build state with one allocator and a resolver sharing its configuration.
    #[must_use]
    pub fn new(allocator: TicketAllocator<S>) -> Self {
        let resolver = TicketResolver::new(allocator.store().clone(), allocator.config());
        Self {
            allocator: Arc::new(allocator),
            resolver: Arc::new(resolver),
        }
    }
}

impl<S> AppState<S> {
    /// Build state from separately configured parts.
    #[must_use]
    pub const fn from_parts(
        allocator: Arc<TicketAllocator<S>>,
        resolver: Arc<TicketResolver<S>>,
    ) -> Self {
        Self {
            allocator,
            resolver,
        }
    }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            allocator: Arc::clone(&self.allocator),
            resolver: Arc::clone(&self.resolver),
        }
    }
}
