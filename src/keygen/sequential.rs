//! Sequential Key Generator
//!
//! Decimal keys from a shared atomic counter.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{check_length, KeyGenerator};
use crate::error::Result;

/// Counter value the first generated key sits just above.
pub const DEFAULT_SEQUENCE_FLOOR: u64 = 10_000;

/// Hands out monotonically increasing decimal keys.
///
/// The requested length is only checked for zero; keys grow in width as the
/// counter does.
#[derive(Debug)]
pub struct SequentialKeyGenerator {
    counter: AtomicU64,
}

impl SequentialKeyGenerator {
    pub fn new() -> Self {
        Self::starting_above(DEFAULT_SEQUENCE_FLOOR)
    }

    /// First generated key will be `floor + 1`.
    pub fn starting_above(floor: u64) -> Self {
        Self {
            counter: AtomicU64::new(floor),
        }
    }
}

impl Default for SequentialKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator for SequentialKeyGenerator {
    fn generate(&self, length: usize) -> Result<String> {
        check_length(length)?;
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(id.to_string())
    }
}
