//! Join-by-code lookup.

use crate::allocator::AllocatorConfig;
use crate::environment::{Clock, SystemClock};
use crate::error::{Result, TicketError};
use crate::store::{TicketStore, storage_key};
use crate::ticket::{Alphabet, SessionCode, SessionTicket};
use std::sync::Arc;

/// Looks up the live ticket for a code a guest typed.
///
/// Shares the alphabet, length, and key prefix of the allocator that issued
/// the codes, so it is built from the same [`AllocatorConfig`].
pub struct TicketResolver<S> {
    store: S,
    clock: Arc<dyn Clock>,
    alphabet: Alphabet,
    code_length: usize,
    key_prefix: String,
}

impl<S: TicketStore> TicketResolver<S> {
    /// Create a resolver for codes issued under `config`.
    #[must_use]
    pub fn new(store: S, config: &AllocatorConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            alphabet: config.alphabet.clone(),
            code_length: config.code_length,
            key_prefix: config.key_prefix.clone(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve a typed code to its live ticket.
    ///
    /// Input is trimmed and uppercased before lookup.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] if the code is malformed (no store access)
    /// - [`TicketError::NotFound`] if no live ticket holds the code
    /// - [`TicketError::StoreUnavailable`] if the store fails
    pub async fn resolve(&self, raw_code: &str) -> Result<SessionTicket> {
        let code = SessionCode::parse(raw_code, &self.alphabet, self.code_length)?;
        let key = storage_key(&self.key_prefix, code.as_str());

        let Some(ticket) = self.store.fetch(&key).await? else {
            tracing::debug!(code = %code, "No live ticket for code");
            return Err(TicketError::NotFound);
        };

        // The store's TTL should already have removed it; guard against skew.
        let now = self.clock.now();
        if ticket.is_expired_at(now) {
            tracing::warn!(
                code = %code,
                expires_at = %ticket.expires_at,
                now = %now,
                "Ticket past expiry still present in store"
            );
            return Err(TicketError::NotFound);
        }

        Ok(ticket)
    }
}
