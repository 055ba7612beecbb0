//! Session tickets and the codes that identify them.

use crate::error::{Result, TicketError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default code alphabet: the 26 uppercase ASCII letters.
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A live session reservation.
///
/// Created only by the allocator after the store acknowledges an atomic
/// reserve. Never mutated afterwards; the store removes it at `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTicket {
    /// Code guests type to join.
    pub code: String,

    /// Allocation time.
    pub created_at: DateTime<Utc>,

    /// Expiry supplied by the caller, strictly after `created_at`.
    pub expires_at: DateTime<Utc>,

    /// Session metadata attached by the caller. Never inspected here.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl SessionTicket {
    /// Create a ticket record.
    #[must_use]
    pub const fn new(
        code: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            code,
            created_at,
            expires_at,
            payload,
        }
    }

    /// Whether the ticket is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Set of symbols codes are drawn from.
///
/// Symbols are distinct printable ASCII characters, so each symbol is one
/// byte and one `char`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Arc<[u8]>,
}

impl Alphabet {
    /// Build an alphabet from a string of symbols.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Config`] if the string is empty, contains a
    /// non-printable or non-ASCII character, or repeats a symbol.
    pub fn new(symbols: &str) -> Result<Self> {
        if symbols.is_empty() {
            return Err(TicketError::Config("alphabet must not be empty".to_string()));
        }

        let mut seen = [false; 128];
        for c in symbols.chars() {
            if !c.is_ascii_graphic() {
                return Err(TicketError::Config(format!(
                    "alphabet symbol {c:?} is not printable ASCII"
                )));
            }
            let slot = &mut seen[c as usize];
            if *slot {
                return Err(TicketError::Config(format!(
                    "alphabet symbol {c:?} appears more than once"
                )));
            }
            *slot = true;
        }

        Ok(Self {
            symbols: Arc::from(symbols.as_bytes()),
        })
    }

    /// The 26 uppercase ASCII letters.
    #[must_use]
    pub fn uppercase() -> Self {
        Self {
            symbols: Arc::from(UPPERCASE.as_bytes()),
        }
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always `false`; construction rejects empty alphabets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol at `index`.
    #[must_use]
    pub fn symbol(&self, index: usize) -> Option<char> {
        self.symbols.get(index).map(|b| char::from(*b))
    }

    /// Whether `c` belongs to the alphabet.
    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        c.is_ascii() && self.symbols.contains(&(c as u8))
    }

    /// Bring typed input to the alphabet's case.
    ///
    /// Single-case alphabets accept either case. An alphabet mixing upper and
    /// lowercase letters is case-sensitive and input is left as typed.
    #[must_use]
    pub fn fold_case(&self, input: &str) -> String {
        let has_upper = self.symbols.iter().any(u8::is_ascii_uppercase);
        let has_lower = self.symbols.iter().any(u8::is_ascii_lowercase);

        match (has_upper, has_lower) {
            (true, true) => input.to_string(),
            (_, true) => input.to_ascii_lowercase(),
            _ => input.to_ascii_uppercase(),
        }
    }

    /// Size of the code space for codes of `length` symbols, saturating at `u64::MAX`.
    ///
    /// ```
    /// use session_tickets_core::Alphabet;
    ///
    /// assert_eq!(Alphabet::uppercase().code_space(4), 456_976);
    /// ```
    #[must_use]
    pub fn code_space(&self, length: usize) -> u64 {
        let base = self.symbols.len() as u64;
        u32::try_from(length)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .unwrap_or(u64::MAX)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::uppercase()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.symbols.iter() {
            write!(f, "{}", char::from(*b))?;
        }
        Ok(())
    }
}

/// A code as typed by a guest, normalized and validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionCode(String);

impl SessionCode {
    /// Parse a typed code: trims whitespace, folds it to the alphabet's case
    /// (see [`Alphabet::fold_case`]), then checks the length and that every
    /// symbol belongs to `alphabet`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] if the code has the wrong length or
    /// contains a symbol outside the alphabet.
    ///
    /// # Examples
    ///
    /// ```
    /// use session_tickets_core::{Alphabet, SessionCode};
    ///
    /// let code = SessionCode::parse(" qxfe ", &Alphabet::uppercase(), 4).unwrap();
    /// assert_eq!(code.as_str(), "QXFE");
    /// assert!(SessionCode::parse("QX1E", &Alphabet::uppercase(), 4).is_err());
    /// ```
    pub fn parse(input: &str, alphabet: &Alphabet, length: usize) -> Result<Self> {
        let normalized = alphabet.fold_case(input.trim());

        let well_formed = normalized.chars().count() == length
            && normalized.chars().all(|c| alphabet.contains(c));

        if well_formed {
            Ok(Self(normalized))
        } else {
            Err(TicketError::Validation(format!(
                "code must be {length} characters from {alphabet}"
            )))
        }
    }

    /// The normalized code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
