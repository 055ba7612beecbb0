//! Random code generation.
//!
//! Codes double as short-lived access tokens, so they are drawn from the
//! operating system's secure random source ([`OsRng`]), never from a
//! statistical PRNG.
//!
//! # Uniformity
//!
//! Mapping a random byte onto an alphabet of `n` symbols with `byte % n` is
//! biased whenever 256 is not a multiple of `n` (for 26 letters the first 22
//! symbols would be slightly favoured). Bytes at or above the largest
//! multiple of `n` that fits in a byte are rejected and redrawn, so every
//! accepted byte maps onto the alphabet exactly uniformly.

use crate::error::{Result, TicketError};
use crate::ticket::Alphabet;
use rand::RngCore;
use rand::rngs::OsRng;

/// Produces one random code per call.
///
/// Implementations must draw each symbol independently and uniformly from
/// `alphabet` and return exactly `length` symbols (`length == 0` yields `""`).
pub trait CodeGenerator: Send + Sync {
    /// Generate a code.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Entropy`] if the random source is unavailable.
    fn generate(&self, alphabet: &Alphabet, length: usize) -> Result<String>;
}

/// Generator backed by the operating system's secure random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureCodeGenerator;

impl SecureCodeGenerator {
    /// Create a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CodeGenerator for SecureCodeGenerator {
    fn generate(&self, alphabet: &Alphabet, length: usize) -> Result<String> {
        sample_code(&mut OsRng, alphabet, length)
    }
}

/// Draw `length` symbols from `alphabet` using rejection sampling over `rng`.
pub(crate) fn sample_code<R: RngCore>(rng: &mut R, alphabet: &Alphabet, length: usize) -> Result<String> {
    let n = alphabet.len();
    if n == 0 || n > 256 {
        return Err(TicketError::Config(format!(
            "alphabet size must be between 1 and 256, got {n}"
        )));
    }

    // Largest multiple of n not exceeding 256; bytes at or above it are rejected.
    let zone = 256 - (256 % n);

    let mut code = String::with_capacity(length);
    let mut buf = [0u8; 32];

    while code.len() < length {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| TicketError::Entropy(e.to_string()))?;

        for &byte in &buf {
            if code.len() == length {
                break;
            }
            let byte = usize::from(byte);
            if byte >= zone {
                continue;
            }
            if let Some(symbol) = alphabet.symbol(byte % n) {
                code.push(symbol);
            }
        }
    }

    Ok(code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_default_code_is_four_uppercase_letters() {
        let code = SecureCodeGenerator.generate(&Alphabet::uppercase(), 4).unwrap();
        assert_eq!(code.len(), 4);
        assert!(code.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_zero_length_is_empty() {
        let code = SecureCodeGenerator.generate(&Alphabet::uppercase(), 0).unwrap();
        assert_eq!(code, "");
    }

    #[test]
    fn test_bytes_in_biased_tail_are_rejected() {
        // 250 % 26 == 16 ('Q') would appear with a plain modulo mapping.
        // Every draw from this rng is 250 followed by zero bytes.
        let mut rng = StepRng::new(250, 0);
        let code = sample_code(&mut rng, &Alphabet::uppercase(), 6).unwrap();
        assert_eq!(code, "AAAAAA");
    }

    #[test]
    fn test_last_byte_below_zone_is_accepted() {
        // 233 is the last accepted byte for 26 symbols (zone = 234).
        let mut rng = StepRng::new(233, 0);
        let code = sample_code(&mut rng, &Alphabet::uppercase(), 1).unwrap();
        assert_eq!(code, "Z");
    }

    #[test]
    fn test_power_of_two_alphabet_rejects_nothing() {
        let alphabet = Alphabet::new("ABCDEFGHIJKLMNOP").unwrap();
        let mut rng = StepRng::new(255, 0);
        let code = sample_code(&mut rng, &alphabet, 1).unwrap();
        assert_eq!(code, "P");
    }

    #[test]
    fn test_distribution_is_roughly_uniform() {
        let alphabet = Alphabet::uppercase();
        let mut counts = [0usize; 26];
        let samples = 26 * 2_000;

        let code = SecureCodeGenerator.generate(&alphabet, samples).unwrap();
        for c in code.bytes() {
            counts[usize::from(c - b'A')] += 1;
        }

        // Expected 2000 per letter; bounds are ~8 standard deviations wide.
        for (i, count) in counts.iter().enumerate() {
            assert!(
                (1_650..=2_350).contains(count),
                "letter {} drawn {count} times",
                char::from(b'A' + u8::try_from(i).unwrap())
            );
        }
    }

    proptest! {
        #[test]
        fn prop_codes_conform_to_alphabet(length in 0usize..64) {
            let code = SecureCodeGenerator.generate(&Alphabet::uppercase(), length).unwrap();
            prop_assert_eq!(code.chars().count(), length);
            prop_assert!(code.chars().all(|c| c.is_ascii_uppercase()));
        }

        #[test]
        fn prop_custom_alphabet_respected(length in 0usize..32) {
            let alphabet = Alphabet::new("23456789ABCDEFGHJKMNPQRSTVWXYZ").unwrap();
            let code = SecureCodeGenerator.generate(&alphabet, length).unwrap();
            prop_assert_eq!(code.len(), length);
            prop_assert!(code.chars().all(|c| alphabet.contains(c)));
        }
    }
}
