//! Scripted ticket store.
//!
//! Replies to each `reserve_if_absent` with the next entry of a script and
//! records every call, for asserting exact attempt counts and arguments.

use session_tickets_core::{Reservation, SessionTicket, StoreError, TicketStore};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One recorded `reserve_if_absent` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedReserve {
    /// Key the allocator asked for
    pub key: String,
    /// Ticket it tried to store
    pub ticket: SessionTicket,
    /// TTL it asked for
    pub ttl_seconds: u64,
}

#[derive(Debug)]
struct Script {
    replies: VecDeque<Result<Reservation, StoreError>>,
    fallback: Result<Reservation, StoreError>,
    calls: Vec<RecordedReserve>,
    reserved: HashMap<String, SessionTicket>,
}

/// Store whose reserve outcomes are fixed in advance.
///
/// Once the script runs out, every further call gets the fallback reply
/// (`Reserved` unless set with [`ScriptedTicketStore::with_fallback`]).
#[derive(Debug, Clone)]
pub struct ScriptedTicketStore {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTicketStore {
    /// Store replying with `replies` in order.
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = Result<Reservation, StoreError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                replies: replies.into_iter().collect(),
                fallback: Ok(Reservation::Reserved),
                calls: Vec::new(),
                reserved: HashMap::new(),
            })),
        }
    }

    /// Store giving the same reply to every call.
    #[must_use]
    pub fn always(reply: Result<Reservation, StoreError>) -> Self {
        Self::new([]).with_fallback(reply)
    }

    /// Store that collides `collisions` times, then reserves.
    #[must_use]
    pub fn collide_then_reserve(collisions: usize) -> Self {
        Self::new(std::iter::repeat_n(Ok(Reservation::AlreadyExists), collisions))
    }

    /// Reply used once the script is exhausted.
    #[must_use]
    pub fn with_fallback(self, reply: Result<Reservation, StoreError>) -> Self {
        self.script.lock().unwrap().fallback = reply;
        self
    }

    /// Every reserve call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedReserve> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Number of reserve calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().calls.len()
    }
}

impl TicketStore for ScriptedTicketStore {
    async fn reserve_if_absent(
        &self,
        key: &str,
        ticket: &SessionTicket,
        ttl_seconds: u64,
    ) -> Result<Reservation, StoreError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(RecordedReserve {
            key: key.to_string(),
            ticket: ticket.clone(),
            ttl_seconds,
        });
        let reply = script
            .replies
            .pop_front()
            .unwrap_or_else(|| script.fallback.clone());

        if reply == Ok(Reservation::Reserved) {
            script.reserved.insert(key.to_string(), ticket.clone());
        }
        reply
    }

    async fn fetch(&self, key: &str) -> Result<Option<SessionTicket>, StoreError> {
        Ok(self.script.lock().unwrap().reserved.get(key).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
