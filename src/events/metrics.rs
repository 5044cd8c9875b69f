//! Metrics Listener
//!
//! Counts registry activity: creations, lookups, removals, expirations and collisions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::{EventListener, ListenerError, RegistryEvent};

// == Metrics Snapshot ==
/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Keys allocated
    pub created: u64,
    /// Successful lookups
    pub accessed: u64,
    /// Explicit deletions
    pub removed: u64,
    /// Records evicted by the sweeper
    pub expired: u64,
    /// Candidate keys that collided during allocation
    pub collisions: u64,
}

// == Metrics Listener ==
/// Lock-free event counters.
#[derive(Debug, Default)]
pub struct MetricsListener {
    created: AtomicU64,
    accessed: AtomicU64,
    removed: AtomicU64,
    expired: AtomicU64,
    collisions: AtomicU64,
}

impl MetricsListener {
    // == Constructor ==
    /// Creates a new MetricsListener with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            accessed: self.accessed.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
        }
    }
}

impl EventListener for MetricsListener {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn on_event(&self, event: &RegistryEvent) -> Result<(), ListenerError> {
        let counter = match event {
            RegistryEvent::Created { .. } => &self.created,
            RegistryEvent::Accessed { .. } => &self.accessed,
            RegistryEvent::Removed { .. } => &self.removed,
            RegistryEvent::Expired { .. } => &self.expired,
            RegistryEvent::Collision { .. } => &self.collisions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn feed(metrics: &MetricsListener, events: &[RegistryEvent]) {
        for event in events {
            metrics.on_event(event).unwrap();
        }
    }

    #[test]
    fn test_metrics_new() {
        let metrics = MetricsListener::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counts_each_kind() {
        let metrics = MetricsListener::new();

        feed(
            &metrics,
            &[
                RegistryEvent::Created { key: "a".into(), value: "v".into(), expiry: 1 },
                RegistryEvent::Created { key: "b".into(), value: "v".into(), expiry: 1 },
                RegistryEvent::Accessed { key: "a".into(), value: "v".into() },
                RegistryEvent::Collision { key: "a".into(), attempt: 1 },
                RegistryEvent::Removed { key: "a".into() },
                RegistryEvent::Expired { key: "b".into() },
            ],
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.created, 2);
        assert_eq!(snapshot.accessed, 1);
        assert_eq!(snapshot.collisions, 1);
        assert_eq!(snapshot.removed, 1);
        assert_eq!(snapshot.expired, 1);
    }}
