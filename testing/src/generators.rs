//! Code generator doubles.

use session_tickets_core::{Alphabet, CodeGenerator, Result, SecureCodeGenerator, TicketError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Wraps a generator and records every code it produces.
#[derive(Debug, Clone)]
pub struct CountingCodeGenerator<G = SecureCodeGenerator> {
    inner: G,
    codes: Arc<Mutex<Vec<String>>>,
}

impl CountingCodeGenerator {
    /// Count calls to the secure generator.
    #[must_use]
    pub fn new() -> Self {
        Self::wrap(SecureCodeGenerator::new())
    }
}

impl Default for CountingCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: CodeGenerator> CountingCodeGenerator<G> {
    /// Count calls to `inner`.
    #[must_use]
    pub fn wrap(inner: G) -> Self {
        Self {
            inner,
            codes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of successful `generate` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.codes.lock().unwrap().len()
    }

    /// Every code produced, in order.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

impl<G: CodeGenerator> CodeGenerator for CountingCodeGenerator<G> {
    fn generate(&self, alphabet: &Alphabet, length: usize) -> Result<String> {
        let code = self.inner.generate(alphabet, length)?;
        self.codes.lock().unwrap().push(code.clone());
        Ok(code)
    }
}

/// Returns preset codes in order, cycling when exhausted.
///
/// Ignores the alphabet and length it is asked for.
#[derive(Debug, Clone)]
pub struct SequenceCodeGenerator {
    codes: Arc<[String]>,
    next: Arc<AtomicUsize>,
}

impl SequenceCodeGenerator {
    /// Cycle through `codes`.
    #[must_use]
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `generate` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self, _alphabet: &Alphabet, _length: usize) -> Result<String> {
        if self.codes.is_empty() {
            return Err(TicketError::Config("sequence generator has no codes".to_string()));
        }
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(self.codes[index % self.codes.len()].clone())
    }
}

/// Always fails as if the secure random source were unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCodeGenerator;

impl CodeGenerator for FailingCodeGenerator {
    fn generate(&self, _alphabet: &Alphabet, _length: usize) -> Result<String> {
        Err(TicketError::Entropy("random source unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_cycles() {
        let generator = SequenceCodeGenerator::new(["AAAA", "BBBB"]);
        let alphabet = Alphabet::uppercase();

        let codes: Vec<String> = (0..3).map(|_| generator.generate(&alphabet, 4).unwrap()).collect();

        assert_eq!(codes, ["AAAA", "BBBB", "AAAA"]);
        assert_eq!(generator.calls(), 3);
    }

    #[test]
    fn test_counting_records_codes() {
        let generator = CountingCodeGenerator::wrap(SequenceCodeGenerator::new(["QXFE"]));
        generator.generate(&Alphabet::uppercase(), 4).unwrap();

        assert_eq!(generator.calls(), 1);
        assert_eq!(generator.codes(), ["QXFE"]);
    }
}
