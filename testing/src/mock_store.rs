//! In-memory TTL ticket store.
//!
//! Faithful stand-in for a TTL-capable key-value store: the reserve is a
//! check-and-insert under one mutex, expired entries are treated as absent,
//! and an optional reaper task prunes them in the background.
//!
//! Deadlines use [`tokio::time::Instant`], so tests can drive expiry with
//! `tokio::time::pause()` and `tokio::time::advance()`.

use session_tickets_core::{Reservation, SessionTicket, StoreError, TicketStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    ticket: SessionTicket,
    ttl_seconds: u64,
    deadline: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// Mock ticket store.
///
/// Clones share the same key space, so a test can keep a handle for
/// inspection while the allocator owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTicketStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    reserve_calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MockTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy `key` with `ticket` for `ttl_seconds`, bypassing the reserve.
    ///
    /// Used to seed collisions.
    pub fn occupy(&self, key: &str, ticket: SessionTicket, ttl_seconds: u64) {
        let entry = Entry {
            ticket,
            ttl_seconds,
            deadline: Instant::now() + Duration::from_secs(ttl_seconds),
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
    }

    /// Whether a live record holds `key`.
    #[must_use]
    pub fn contains_live(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// TTL the live record under `key` was stored with.
    #[must_use]
    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.ttl_seconds)
    }

    /// Number of live records.
    #[must_use]
    pub fn live_count(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Number of records held, live or not yet reaped.
    #[must_use]
    pub fn stored_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Number of `reserve_if_absent` calls received.
    #[must_use]
    pub fn reserve_calls(&self) -> usize {
        self.reserve_calls.load(Ordering::SeqCst)
    }

    /// Simulate an outage: every operation fails with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Remove expired records, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Spawn a background task purging expired records every `interval`.
    ///
    /// Abort the returned handle to stop it.
    #[must_use]
    pub fn spawn_reaper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::trace!(purged, "Reaped expired tickets");
                }
            }
        })
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Connection("mock store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl TicketStore for MockTicketStore {
    async fn reserve_if_absent(
        &self,
        key: &str,
        ticket: &SessionTicket,
        ttl_seconds: u64,
    ) -> Result<Reservation, StoreError> {
        self.reserve_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();

        // Atomic check-and-insert under mutex protection
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(Reservation::AlreadyExists);
        }

        entries.insert(
            key.to_string(),
            Entry {
                ticket: ticket.clone(),
                ttl_seconds,
                deadline: now + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(Reservation::Reserved)
    }

    async fn fetch(&self, key: &str) -> Result<Option<SessionTicket>, StoreError> {
        self.check_available()?;

        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.ticket.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
