//! Logging Listener

use tracing::info;

use super::{EventListener, ListenerError, RegistryEvent};
use crate::registry::format_timestamp;

/// Writes one log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl LoggingListener {
    pub fn new() -> Self {
        Self
    }
}

impl EventListener for LoggingListener {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn on_event(&self, event: &RegistryEvent) -> Result<(), ListenerError> {
        match event {
            RegistryEvent::Created { key, value, expiry } => {
                info!(key = %key, value = %value, expires = %format_timestamp(*expiry), "Key created");
            }
            RegistryEvent::Accessed { key, value } => {
                info!(key = %key, value = %value, "Key resolved");
            }
            RegistryEvent::Removed { key } => info!(key = %key, "Key deleted"),
            RegistryEvent::Expired { key } => info!(key = %key, "Key expired"),
            RegistryEvent::Collision { key, attempt } => {
                info!(key = %key, attempt, "Key collision");
            }
        }
        Ok(())
    }
}
