//! Key Generation Module
//!
//! Candidate key producers. The allocator depends only on [`KeyGenerator`];
//! which algorithm sits behind it is a configuration choice.

mod random;
mod sequential;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{RegistryError, Result};

pub use random::{RandomKeyGenerator, ALPHABET};
pub use sequential::{SequentialKeyGenerator, DEFAULT_SEQUENCE_FLOOR};

/// Produces candidate keys.
///
/// Implementations must be safe to call from many threads at once and have no
/// side effects beyond their own internal state.
pub trait KeyGenerator: Send + Sync {
    /// Returns the next candidate key, or `InvalidLength` when `length` is 0.
    fn generate(&self, length: usize) -> Result<String>;
}

/// Available generation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    #[default]
    Random,
    Sequential,
}

impl KeyStrategy {
    /// Builds the generator for this strategy.
    pub fn build(self) -> Arc<dyn KeyGenerator> {
        match self {
            KeyStrategy::Random => Arc::new(RandomKeyGenerator::new()),
            KeyStrategy::Sequential => Arc::new(SequentialKeyGenerator::new()),
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(KeyStrategy::Random),
            "sequential" => Ok(KeyStrategy::Sequential),
            other => Err(RegistryError::InvalidConfiguration(format!(
                "Unknown key strategy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::Random => write!(f, "random"),
            KeyStrategy::Sequential => write!(f, "sequential"),
        }
    }
}

pub(crate) fn check_length(length: usize) -> Result<()> {
    if length == 0 {
        return Err(RegistryError::InvalidLength(length));
    }
    Ok(())
}
