//! Events Module
//!
//! Fire-and-forget notification boundary between the registry and whatever
//! wants to observe it.
//!
//! Components receive an `Arc<dyn EventSink>` at construction and call it
//! after their store operation has returned, never while holding a store
//! lock. [`EventPublisher`] is the production sink: it queues events and fans
//! them out to [`EventListener`]s on a background task.

mod analytics;
mod logging;
mod metrics;
mod publisher;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub use analytics::AnalyticsListener;
pub use logging::LoggingListener;
pub use metrics::{MetricsListener, MetricsSnapshot};
pub use publisher::EventPublisher;

// == Registry Event ==
/// Something that happened to a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEvent {
    Created { key: String, value: String, expiry: u64 },
    Accessed { key: String, value: String },
    Removed { key: String },
    Expired { key: String },
    Collision { key: String, attempt: u32 },
}

impl RegistryEvent {
    /// Short name of the event variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryEvent::Created { .. } => "created",
            RegistryEvent::Accessed { .. } => "accessed",
            RegistryEvent::Removed { .. } => "removed",
            RegistryEvent::Expired { .. } => "expired",
            RegistryEvent::Collision { .. } => "collision",
        }
    }

    /// The key the event is about.
    pub fn key(&self) -> &str {
        match self {
            RegistryEvent::Created { key, .. }
            | RegistryEvent::Accessed { key, .. }
            | RegistryEvent::Removed { key }
            | RegistryEvent::Expired { key }
            | RegistryEvent::Collision { key, .. } => key,
        }
    }
}

// == Event Sink ==
/// Receives registry notifications.
///
/// `publish` returns nothing: a sink that fails must deal with it internally.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: RegistryEvent);

    fn notify_created(&self, key: &str, value: &str, expiry: u64) {
        self.publish(RegistryEvent::Created {
            key: key.to_string(),
            value: value.to_string(),
            expiry,
        });
    }

    fn notify_accessed(&self, key: &str, value: &str) {
        self.publish(RegistryEvent::Accessed {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    fn notify_removed(&self, key: &str) {
        self.publish(RegistryEvent::Removed {
            key: key.to_string(),
        });
    }

    fn notify_expired(&self, key: &str) {
        self.publish(RegistryEvent::Expired {
            key: key.to_string(),
        });
    }

    fn notify_collision(&self, key: &str, attempt: u32) {
        self.publish(RegistryEvent::Collision {
            key: key.to_string(),
            attempt,
        });
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: RegistryEvent) {}
}

// == Event Listener ==
/// Failure reported by a listener. Logged by the sink, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{listener} failed to handle {event}: {reason}")]
pub struct ListenerError {
    pub listener: &'static str,
    pub event: &'static str,
    pub reason: String,
}

/// A consumer of events dispatched by [`EventPublisher`] or [`InlineSink`].
pub trait EventListener: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    fn on_event(&self, event: &RegistryEvent) -> std::result::Result<(), ListenerError>;
}

/// Hands `event` to every listener in order.
///
/// An error or a panic from one listener is logged and does not stop the
/// remaining listeners from seeing the event.
pub(crate) fn deliver(listeners: &[Arc<dyn EventListener>], event: &RegistryEvent) {
    for listener in listeners {
        match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Event listener returned an error"),
            Err(_) => warn!(
                listener = listener.name(),
                kind = event.kind(),
                "Event listener panicked"
            ),
        }
    }
}

/// Calls listeners synchronously on the publishing thread.
///
/// Needs no runtime. Suited to tests and embedding; a slow listener slows the caller.
#[derive(Default)]
pub struct InlineSink {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl InlineSink {
    pub fn new(listeners: Vec<Arc<dyn EventListener>>) -> Self {
        Self { listeners }
    }
}

impl EventSink for InlineSink {
    fn publish(&self, event: RegistryEvent) {
        deliver(&self.listeners, &event);
    }
}

/// Collects every published event in memory. Test helper.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: parking_lot::Mutex<Vec<RegistryEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn publish(&self, event: RegistryEvent) {
        self.events.lock().push(event);
    }
}
