//! Random Key Generator
//!
//! Alphanumeric keys drawn from the thread-local RNG.

use rand::{rng, Rng};

use super::{check_length, KeyGenerator};
use crate::error::Result;

/// The 62 symbols a random key is drawn from.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws each key character uniformly from [`ALPHABET`].
///
/// Uses the thread-local RNG, which is ChaCha-based and reseeded from the OS,
/// so calls from many threads neither contend nor share state.
#[derive(Debug, Default, Clone)]
pub struct RandomKeyGenerator;

impl RandomKeyGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, length: usize) -> Result<String> {
        check_length(length)?;

        let mut rng = rng();
        let key = (0..length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Ok(key)
    }
}
