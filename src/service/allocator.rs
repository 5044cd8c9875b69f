//! Allocation Protocol
//!
//! Turns a value into a unique, persisted key: generate a candidate, try to
//! save it, and retry on collision up to a fixed bound.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{KeyService, Validator};
use crate::config::Config;
use crate::error::{RegistryError, Result};
use crate::events::EventSink;
use crate::keygen::KeyGenerator;
use crate::registry::{current_timestamp, Record, RegistryStore};

// == Allocation Settings ==
/// Tunables for [`Allocator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSettings {
    /// Length of generated keys
    pub key_length: usize,
    /// Collisions tolerated before giving up
    pub max_collision_retries: u32,
    /// Lifetime of new records in seconds
    pub default_expiry_secs: u64,
    /// Return the existing key for an already registered value
    pub suppress_duplicate_values: bool,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AllocationSettings {
    fn from(config: &Config) -> Self {
        Self {
            key_length: config.key_length,
            max_collision_retries: config.max_collision_retries,
            default_expiry_secs: config.default_expiry_secs,
            suppress_duplicate_values: config.suppress_duplicate_values,
        }
    }
}

// == Allocator ==
/// Allocates keys against a shared [`RegistryStore`].
///
/// This is the innermost [`KeyService`]; caching and rate limiting wrap it.
pub struct Allocator {
    store: Arc<RegistryStore>,
    generator: Arc<dyn KeyGenerator>,
    sink: Arc<dyn EventSink>,
    validator: Validator,
    settings: AllocationSettings,
}

impl Allocator {
    /// Creates an allocator using the default validation pipeline.
    ///
    /// Fails with `InvalidLength` for a zero key length and
    /// `InvalidConfiguration` for a zero expiry.
    pub fn new(
        store: Arc<RegistryStore>,
        generator: Arc<dyn KeyGenerator>,
        sink: Arc<dyn EventSink>,
        settings: AllocationSettings,
    ) -> Result<Self> {
        if settings.key_length == 0 {
            return Err(RegistryError::InvalidLength(settings.key_length));
        }
        if settings.default_expiry_secs == 0 {
            return Err(RegistryError::InvalidConfiguration(
                "Default expiry must be positive".to_string(),
            ));
        }

        Ok(Self {
            store,
            generator,
            sink,
            validator: Validator::default(),
            settings,
        })
    }

    /// Replaces the validation pipeline. `Validator::permissive()` turns validation off.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Returns a key that resolves to `value`.
    ///
    /// The expiry is fixed before the first candidate is generated, so every
    /// retry of one request shares the same TTL origin.
    pub fn allocate(&self, value: &str) -> Result<String> {
        self.validator.validate(value)?;

        if self.settings.suppress_duplicate_values {
            if let Some(existing) = self.store.find_by_value(value) {
                debug!(key = %existing, "Returning existing key for value");
                return Ok(existing);
            }
        }

        let expiry = current_timestamp().saturating_add(self.settings.default_expiry_secs);
        let mut attempt: u32 = 0;

        loop {
            if attempt > self.settings.max_collision_retries {
                warn!(attempts = attempt, "Key allocation exhausted its retry budget");
                return Err(RegistryError::AllocationExhausted { attempts: attempt });
            }

            let candidate = self.generator.generate(self.settings.key_length)?;

            match self.store.save(&candidate, value, expiry) {
                Ok(()) => {
                    debug!(key = %candidate, expiry, "Allocated key");
                    self.sink.notify_created(&candidate, value, expiry);
                    return Ok(candidate);
                }
                Err(RegistryError::DuplicateKey(_)) => {
                    attempt += 1;
                    debug!(key = %candidate, attempt, "Key collision, retrying");
                    self.sink.notify_collision(&candidate, attempt);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// == Key Service ==
impl KeyService for Allocator {
    fn shorten(&self, value: &str) -> Result<String> {
        self.allocate(value)
    }

    fn resolve(&self, key: &str) -> Result<Record> {
        if key.trim().is_empty() {
            return Err(RegistryError::InvalidValue("Key cannot be empty".to_string()));
        }

        let record = self.store.record(key)?;
        self.sink.notify_accessed(&record.key, &record.value);
        Ok(record)
    }

    fn delete(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Some(record) => {
                debug!(key = %record.key, "Deleted key");
                self.sink.notify_removed(&record.key);
                true
            }
            None => false,
        }
    }
}
