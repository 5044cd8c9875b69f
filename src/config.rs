//! Configuration Module
//!
//! Handles loading and validating registry configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RegistryError, Result};
use crate::keygen::KeyStrategy;
use crate::service::ServiceLayer;

/// Registry configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Values are checked once by [`Config::validate`] so that bad settings fail at
/// startup rather than on a request path.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Length of generated keys
    pub key_length: usize,
    /// Collisions tolerated before an allocation gives up
    pub max_collision_retries: u32,
    /// Lifetime of a new record in seconds
    pub default_expiry_secs: u64,
    /// Interval between eviction sweeps in seconds
    pub sweep_frequency_secs: u64,
    /// Return the existing key when the same value is shortened twice
    pub suppress_duplicate_values: bool,
    /// Run the value validation pipeline before allocating
    pub validate_values: bool,
    /// Key generation strategy
    pub key_strategy: KeyStrategy,
    /// Service layers wrapped around the allocator, outermost first
    pub layers: Vec<ServiceLayer>,
    /// Lookups of a single key allowed per minute by the rate limiting layer
    pub rate_limit_per_minute: u32,
    /// Capacity of the event dispatch queue
    pub event_queue_capacity: usize,
    /// Bounded wait for background tasks on shutdown, in seconds
    pub shutdown_grace_secs: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `KEY_LENGTH` - Generated key length (default: 6)
    /// - `MAX_COLLISION_RETRIES` - Collision retry bound (default: 5)
    /// - `DEFAULT_EXPIRY_SECS` - Record lifetime (default: 3600)
    /// - `SWEEP_FREQUENCY_SECS` - Eviction sweep interval (default: 60)
    /// - `DUPLICATE_VALUE_SUPPRESSION` - Reuse keys for repeated values (default: true)
    /// - `VALUE_VALIDATION` - Validate values before allocation (default: true)
    /// - `KEY_STRATEGY` - `random` or `sequential` (default: random)
    /// - `SERVICE_LAYERS` - Comma separated `cache`, `rate_limit` (default: none)
    /// - `RATE_LIMIT_PER_MINUTE` - Per-key lookup budget (default: 100)
    /// - `EVENT_QUEUE_CAPACITY` - Event queue size (default: 1024)
    /// - `SHUTDOWN_GRACE_SECS` - Shutdown wait bound (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// A variable that is set but cannot be parsed is an error, not a silent default.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let layers = match env::var("SERVICE_LAYERS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ServiceLayer::from_str)
                .collect::<Result<Vec<_>>>()?,
            Err(_) => defaults.layers,
        };

        let config = Self {
            key_length: env_or("KEY_LENGTH", defaults.key_length)?,
            max_collision_retries: env_or("MAX_COLLISION_RETRIES", defaults.max_collision_retries)?,
            default_expiry_secs: env_or("DEFAULT_EXPIRY_SECS", defaults.default_expiry_secs)?,
            sweep_frequency_secs: env_or("SWEEP_FREQUENCY_SECS", defaults.sweep_frequency_secs)?,
            suppress_duplicate_values: env_or(
                "DUPLICATE_VALUE_SUPPRESSION",
                defaults.suppress_duplicate_values,
            )?,
            validate_values: env_or("VALUE_VALIDATION", defaults.validate_values)?,
            key_strategy: env_or("KEY_STRATEGY", defaults.key_strategy)?,
            layers,
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute)?,
            event_queue_capacity: env_or("EVENT_QUEUE_CAPACITY", defaults.event_queue_capacity)?,
            shutdown_grace_secs: env_or("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace_secs)?,
            server_port: env_or("SERVER_PORT", defaults.server_port)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the registry cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.key_length == 0 {
            return Err(invalid("KEY_LENGTH must be at least 1"));
        }
        if self.default_expiry_secs == 0 {
            return Err(invalid("DEFAULT_EXPIRY_SECS must be positive"));
        }
        if self.sweep_frequency_secs == 0 {
            return Err(invalid("SWEEP_FREQUENCY_SECS must be at least 1"));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(invalid("RATE_LIMIT_PER_MINUTE must be positive"));
        }
        if self.event_queue_capacity == 0 {
            return Err(invalid("EVENT_QUEUE_CAPACITY must be positive"));
        }
        Ok(())
    }

    /// Sweep interval as a Duration.
    pub fn sweep_frequency(&self) -> Duration {
        Duration::from_secs(self.sweep_frequency_secs)
    }

    /// Shutdown wait bound as a Duration.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_length: 6,
            max_collision_retries: 5,
            default_expiry_secs: 3600,
            sweep_frequency_secs: 60,
            suppress_duplicate_values: true,
            validate_values: true,
            key_strategy: KeyStrategy::Random,
            layers: Vec::new(),
            rate_limit_per_minute: 100,
            event_queue_capacity: 1024,
            shutdown_grace_secs: 30,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(&format!("{} has an unparsable value '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

fn invalid(message: &str) -> RegistryError {
    RegistryError::InvalidConfiguration(message.to_string())
}
