//! Ticket allocation.
//!
//! [`TicketAllocator`] reserves a fresh code for each call. It holds no
//! mutable state: concurrent callers coordinate only through the store's
//! atomic reserve, and a lost race is just another collision.
//!
//! # Attempt outcomes
//!
//! Every attempt resolves to exactly one [`AttemptOutcome`]:
//!
//! - `Reserved` ends the call successfully
//! - `Collision` is retried with a fresh code, never reported on its own
//! - `StoreError` ends the call immediately; an unhealthy store is not a
//!   collision, and retrying it once per generated code would multiply load
//!   during an outage
//!
//! # Latency
//!
//! Worst case is `max_attempts` store round trips (each bounded by the
//! adapter's timeout) plus any configured [`CollisionBackoff`].

use crate::environment::{Clock, SystemClock};
use crate::error::{Result, StoreError, TicketError};
use crate::generator::{CodeGenerator, SecureCodeGenerator};
use crate::store::{Reservation, TicketStore, storage_key};
use crate::ticket::{Alphabet, SessionTicket};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Default code length.
pub const DEFAULT_CODE_LENGTH: usize = 4;

/// Default number of reserve attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default storage key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "session";

/// Outcome of a single reserve attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// A live ticket already holds the generated code.
    Collision,

    /// The code was reserved; the store now owns the ticket's lifetime.
    Reserved(SessionTicket),

    /// The store's primitive failed.
    StoreError(StoreError),
}

/// Optional delay between collision attempts.
///
/// `delay = min(initial_delay * multiplier^retry, max_delay) * jitter`, with
/// jitter drawn from `[0.5, 1.0]`. Never applied after a store error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBackoff {
    /// Delay before the first retry
    initial_delay: Duration,

    /// Cap on any single delay
    max_delay: Duration,

    /// Growth factor per retry
    multiplier: f64,
}

impl CollisionBackoff {
    /// Create a backoff policy.
    ///
    /// Defaults:
    /// - `initial_delay`: 5 milliseconds
    /// - `max_delay`: 100 milliseconds
    /// - `multiplier`: 2.0
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the cap on any single delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the growth factor.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay before retry number `retry` (0-indexed).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        use rand::Rng;

        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let base_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped_secs = base_secs.min(self.max_delay.as_secs_f64());

        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::try_from_secs_f64(capped_secs * jitter).unwrap_or(self.max_delay)
    }

    /// Check the policy never shrinks or produces a non-finite delay.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Config`] if the multiplier is below 1.0 or not
    /// finite, or the initial delay exceeds the cap.
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(TicketError::Config(format!(
                "backoff multiplier must be a finite value of at least 1.0, got {}",
                self.multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(TicketError::Config(format!(
                "backoff initial_delay {:?} exceeds max_delay {:?}",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }
}

impl Default for CollisionBackoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocator policy.
///
/// The defaults (4 uppercase letters, 8 attempts) give a code space of
/// 26^4 = 456,976. Exhaustion under normal load means either a burst of
/// concurrent creates or a code space too small for the live population.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocatorConfig {
    /// Symbols per code.
    pub code_length: usize,

    /// Reserve attempts per call before reporting exhaustion.
    pub max_attempts: u32,

    /// Namespace prefix for storage keys (`<prefix>:<CODE>`).
    pub key_prefix: String,

    /// Symbols codes are drawn from.
    pub alphabet: Alphabet,

    /// Delay between collision attempts; `None` retries immediately.
    pub backoff: Option<CollisionBackoff>,
}

impl AllocatorConfig {
    /// Create a configuration with default policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            alphabet: Alphabet::uppercase(),
            backoff: None,
        }
    }

    /// Set code length.
    #[must_use]
    pub const fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Set maximum attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the key namespace prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the code alphabet.
    #[must_use]
    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    /// Enable backoff between collision attempts.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: CollisionBackoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Check the policy is usable.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Config`] if `max_attempts` or `code_length` is
    /// zero, the key prefix is empty or contains whitespace, or the backoff
    /// policy is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(TicketError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.code_length == 0 {
            return Err(TicketError::Config("code_length must be at least 1".to_string()));
        }
        if self.key_prefix.is_empty() || self.key_prefix.chars().any(char::is_whitespace) {
            return Err(TicketError::Config(format!(
                "key_prefix {:?} must be non-empty without whitespace",
                self.key_prefix
            )));
        }
        if let Some(backoff) = &self.backoff {
            backoff.validate()?;
        }
        Ok(())
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a caller-supplied expiry.
///
/// Accepts RFC 3339 / ISO-8601 timestamps with an offset and normalizes them
/// to UTC. Whether the instant is in the future is checked at allocation.
///
/// # Errors
///
/// Returns [`TicketError::Validation`] if the value is missing, blank, or not
/// a timestamp.
///
/// # Examples
///
/// ```
/// use session_tickets_core::parse_expiry;
///
/// let at = parse_expiry(Some("2030-01-01T01:00:00+01:00")).unwrap();
/// assert_eq!(at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
/// assert!(parse_expiry(None).is_err());
/// assert!(parse_expiry(Some("tomorrow")).is_err());
/// ```
pub fn parse_expiry(raw: Option<&str>) -> Result<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        TicketError::Validation("expiresAt is required".to_string())
    })?;

    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| {
            TicketError::Validation(format!(
                "expiresAt must be an ISO-8601 timestamp in the future, got {raw:?}"
            ))
        })
}

/// Whole seconds from `now` until `expires_at`.
///
/// # Errors
///
/// Returns [`TicketError::Validation`] unless the result is at least one second.
pub fn ttl_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
    let seconds = (expires_at - now).num_seconds();
    u64::try_from(seconds)
        .ok()
        .filter(|ttl| *ttl > 0)
        .ok_or_else(|| TicketError::Validation("expiresAt must be in the future".to_string()))
}

/// Reserves unique session codes against a [`TicketStore`].
///
/// # Thread Safety
///
/// Share one allocator behind an `Arc`; `allocate` takes `&self` and keeps
/// no state between calls.
pub struct TicketAllocator<S, G = SecureCodeGenerator> {
    store: S,
    generator: G,
    clock: Arc<dyn Clock>,
    config: AllocatorConfig,
}

impl<S: TicketStore> TicketAllocator<S> {
    /// Create an allocator using the secure generator and the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Config`] if `config` is invalid.
    pub fn new(store: S, config: AllocatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            generator: SecureCodeGenerator::new(),
            clock: Arc::new(SystemClock),
            config,
        })
    }
}

impl<S: TicketStore, G: CodeGenerator> TicketAllocator<S, G> {
    /// Replace the code generator.
    #[must_use]
    pub fn with_generator<G2: CodeGenerator>(self, generator: G2) -> TicketAllocator<S, G2> {
        TicketAllocator {
            store: self.store,
            generator,
            clock: self.clock,
            config: self.config,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Allocator policy.
    #[must_use]
    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Allocate a new ticket expiring at `expires_at`.
    ///
    /// Each call allocates an independent ticket with a new code, even for
    /// identical arguments. Callers wanting idempotent retries must
    /// de-duplicate upstream.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] if `expires_at` is not at least one whole
    ///   second in the future; no code is generated and the store is not touched.
    ///   Checked again before each retry, so an expiry that lapses while
    ///   collisions are retried also ends the call here
    /// - [`TicketError::Exhausted`] if every attempt collided
    /// - [`TicketError::StoreUnavailable`] on the first store failure
    /// - [`TicketError::Entropy`] if the random source fails
    pub async fn allocate(
        &self,
        expires_at: DateTime<Utc>,
        payload: Option<serde_json::Value>,
    ) -> Result<SessionTicket> {
        let payload = payload.unwrap_or(serde_json::Value::Null);
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            // Re-read each attempt so time spent on earlier attempts shortens the TTL.
            let now = self.clock.now();
            let ttl = ttl_seconds(expires_at, now)?;

            let code = self
                .generator
                .generate(&self.config.alphabet, self.config.code_length)?;
            let key = storage_key(&self.config.key_prefix, &code);
            let ticket = SessionTicket::new(code, now, expires_at, payload.clone());

            match self.attempt(&key, ticket, ttl).await {
                AttemptOutcome::Reserved(ticket) => {
                    metrics::counter!("tickets.allocated").increment(1);
                    metrics::histogram!("tickets.allocation_attempts").record(f64::from(attempt));
                    tracing::info!(
                        code = %ticket.code,
                        ttl_seconds = ttl,
                        attempts = attempt,
                        expires_at = %ticket.expires_at,
                        "Allocated session ticket"
                    );
                    return Ok(ticket);
                }
                AttemptOutcome::Collision => {
                    metrics::counter!("tickets.collisions").increment(1);
                    tracing::debug!(attempt, max_attempts, "Code already live, drawing another");

                    if attempt < max_attempts {
                        if let Some(backoff) = &self.config.backoff {
                            tokio::time::sleep(backoff.delay_for_retry(attempt - 1)).await;
                        }
                    }
                }
                AttemptOutcome::StoreError(error) => {
                    metrics::counter!("tickets.store_errors").increment(1);
                    tracing::warn!(attempt, error = %error, "Ticket store failed during reserve");
                    return Err(TicketError::StoreUnavailable(error));
                }
            }
        }

        metrics::counter!("tickets.exhausted").increment(1);
        tracing::warn!(
            attempts = max_attempts,
            code_space = self.config.alphabet.code_space(self.config.code_length),
            "Could not allocate a session code; every attempt collided"
        );
        Err(TicketError::Exhausted {
            attempts: max_attempts,
        })
    }

    async fn attempt(&self, key: &str, ticket: SessionTicket, ttl_seconds: u64) -> AttemptOutcome {
        match self.store.reserve_if_absent(key, &ticket, ttl_seconds).await {
            Ok(Reservation::Reserved) => AttemptOutcome::Reserved(ticket),
            Ok(Reservation::AlreadyExists) => AttemptOutcome::Collision,
            Err(error) => AttemptOutcome::StoreError(error),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_ttl_floors_fractional_seconds() {
        let now = at("2025-01-01T00:00:00Z");
        let expires = now + ChronoDuration::milliseconds(3_600_900);
        assert_eq!(ttl_seconds(expires, now).unwrap(), 3600);
    }

    #[test]
    fn test_ttl_rejects_sub_second_future() {
        let now = at("2025-01-01T00:00:00Z");
        let expires = now + ChronoDuration::milliseconds(999);
        assert!(matches!(ttl_seconds(expires, now), Err(TicketError::Validation(_))));
    }

    #[test]
    fn test_ttl_rejects_now_and_past() {
        let now = at("2025-01-01T00:00:00Z");
        let err = ttl_seconds(now, now).unwrap_err();
        assert_eq!(err.to_string(), "expiresAt must be in the future");
        assert!(ttl_seconds(now - ChronoDuration::seconds(10), now).is_err());
    }

    #[test]
    fn test_parse_expiry_normalizes_to_utc() {
        let parsed = parse_expiry(Some("2025-06-01T12:00:00-04:00")).unwrap();
        assert_eq!(parsed, at("2025-06-01T16:00:00Z"));
    }

    #[test]
    fn test_parse_expiry_rejects_blank() {
        let err = parse_expiry(Some("   ")).unwrap_err();
        assert_eq!(err.to_string(), "expiresAt is required");
    }

    #[test]
    fn test_config_defaults() {
        let config = AllocatorConfig::default();
        assert_eq!(config.code_length, 4);
        assert_eq!(config.max_attempts, 8);
        assert_eq!(config.key_prefix, "session");
        assert_eq!(config.alphabet, Alphabet::uppercase());
        assert!(config.backoff.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_attempts() {
        let config = AllocatorConfig::new().with_max_attempts(0);
        assert!(matches!(config.validate(), Err(TicketError::Config(_))));
    }

    #[test]
    fn test_config_rejects_bad_prefix() {
        assert!(AllocatorConfig::new().with_key_prefix("").validate().is_err());
        assert!(AllocatorConfig::new().with_key_prefix("my session").validate().is_err());
        assert!(AllocatorConfig::new().with_key_prefix("tenant-a:session").validate().is_ok());
    }

    #[test]
    fn test_config_rejects_shrinking_or_non_finite_backoff() {
        for multiplier in [-2.0, 0.5, f64::INFINITY, f64::NAN] {
            let config = AllocatorConfig::new()
                .with_backoff(CollisionBackoff::new().with_multiplier(multiplier));
            assert!(
                matches!(config.validate(), Err(TicketError::Config(_))),
                "multiplier {multiplier} accepted"
            );
        }

        let inverted = CollisionBackoff::new()
            .with_initial_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_millis(50));
        assert!(AllocatorConfig::new().with_backoff(inverted).validate().is_err());

        assert!(AllocatorConfig::new().with_backoff(CollisionBackoff::new()).validate().is_ok());
    }

    #[test]
    fn test_backoff_delay_never_panics_on_overflow() {
        let backoff = CollisionBackoff::new()
            .with_initial_delay(Duration::MAX)
            .with_max_delay(Duration::MAX)
            .with_multiplier(f64::MAX);

        let delay = backoff.delay_for_retry(5);
        assert!(delay >= Duration::MAX / 3);
    }

    #[test]
    fn test_backoff_is_capped_and_jittered() {
        let backoff = CollisionBackoff::new()
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(40))
            .with_multiplier(2.0);

        let first = backoff.delay_for_retry(0);
        assert!(first >= Duration::from_millis(4) && first <= Duration::from_millis(11));

        let late = backoff.delay_for_retry(20);
        assert!(late >= Duration::from_millis(19) && late <= Duration::from_millis(41));
    }
}
