//! Service Module
//!
//! The allocation protocol and the layers that can be stacked on top of it.
//!
//! # Layers
//! Every stage implements [`KeyService`] and holds the next stage. The stack is
//! assembled once at startup by [`compose`] from the configured layer list.

mod allocator;
mod layers;
mod validate;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{RegistryError, Result};
use crate::events::EventSink;
use crate::registry::{Record, RegistryStore};

pub use allocator::{AllocationSettings, Allocator};
pub use layers::{CachingService, RateLimitingService};
pub use validate::{
    http_url, max_length, not_blank, url_format, Check, Validator, MAX_VALUE_LENGTH,
};

/// Operations a request handler needs from the registry.
pub trait KeyService: Send + Sync {
    /// Returns a key that resolves to `value`, allocating one if needed.
    fn shorten(&self, value: &str) -> Result<String>;

    /// Looks up the record stored under `key`.
    fn resolve(&self, key: &str) -> Result<Record>;

    /// Deletes `key`. Returns false if it was not present.
    fn delete(&self, key: &str) -> bool;
}

/// A stage that can be wrapped around the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLayer {
    Cache,
    RateLimit,
}

impl FromStr for ServiceLayer {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cache" => Ok(ServiceLayer::Cache),
            "rate_limit" | "rate-limit" => Ok(ServiceLayer::RateLimit),
            other => Err(RegistryError::InvalidConfiguration(format!(
                "Unknown service layer '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ServiceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceLayer::Cache => write!(f, "cache"),
            ServiceLayer::RateLimit => write!(f, "rate_limit"),
        }
    }
}

/// Wraps `base` in the configured layers. The first listed layer ends up outermost.
pub fn compose(base: Arc<dyn KeyService>, config: &Config) -> Arc<dyn KeyService> {
    config
        .layers
        .iter()
        .rev()
        .fold(base, |inner, layer| -> Arc<dyn KeyService> {
            match layer {
                ServiceLayer::Cache => Arc::new(CachingService::new(inner)),
                ServiceLayer::RateLimit => Arc::new(RateLimitingService::new(
                    inner,
                    config.rate_limit_per_minute,
                    Duration::from_secs(60),
                )),
            }
        })
}

/// Assembles the configured stack over `store`: generator, allocator, then layers.
pub fn build(
    config: &Config,
    store: Arc<RegistryStore>,
    sink: Arc<dyn EventSink>,
) -> Result<Arc<dyn KeyService>> {
    let validator = if config.validate_values {
        Validator::default()
    } else {
        Validator::permissive()
    };
    let allocator = Allocator::new(
        store,
        config.key_strategy.build(),
        sink,
        AllocationSettings::from(config),
    )?
    .with_validator(validator);
    Ok(compose(Arc::new(allocator), config))
}
