//! Analytics Listener
//!
//! Tracks per-key access counts for the lifetime of each key.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::info;

use super::{EventListener, ListenerError, RegistryEvent};
use crate::registry::current_timestamp;

/// Access count at which a key is reported as popular.
pub const POPULAR_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, Copy)]
struct KeyActivity {
    accesses: u64,
    created_at: u64,
}

// == Analytics Listener ==
/// Per-key usage tracking. Forgets a key once it is deleted or expires.
#[derive(Debug, Default)]
pub struct AnalyticsListener {
    activity: Mutex<HashMap<String, KeyActivity>>,
}

impl AnalyticsListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookups recorded for `key` since it was created, 0 if untracked.
    pub fn access_count(&self, key: &str) -> u64 {
        self.activity
            .lock()
            .get(key)
            .map_or(0, |activity| activity.accesses)
    }

    /// The `limit` most accessed live keys, busiest first.
    pub fn top(&self, limit: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self
            .activity
            .lock()
            .iter()
            .map(|(key, activity)| (key.clone(), activity.accesses))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    fn forget(&self, key: &str, reason: &'static str) {
        if let Some(activity) = self.activity.lock().remove(key) {
            let lifespan = current_timestamp().saturating_sub(activity.created_at);
            info!(
                key,
                reason,
                accesses = activity.accesses,
                lifespan_secs = lifespan,
                "Key retired"
            );
        }
    }
}

// == Event Listener ==
impl EventListener for AnalyticsListener {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn on_event(&self, event: &RegistryEvent) -> Result<(), ListenerError> {
        match event {
            RegistryEvent::Created { key, .. } => {
                self.activity.lock().insert(
                    key.clone(),
                    KeyActivity {
                        accesses: 0,
                        created_at: current_timestamp(),
                    },
                );
            }
            RegistryEvent::Accessed { key, .. } => {
                let accesses = self.activity.lock().get_mut(key).map(|activity| {
                    activity.accesses += 1;
                    activity.accesses
                });
                if accesses == Some(POPULAR_THRESHOLD) {
                    info!(key = %key, accesses = POPULAR_THRESHOLD, "Key is popular");
                }
            }
            RegistryEvent::Removed { key } => self.forget(key, "deleted"),
            RegistryEvent::Expired { key } => self.forget(key, "expired"),
            RegistryEvent::Collision { .. } => {}
        }
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn created(key: &str) -> RegistryEvent {
        RegistryEvent::Created {
            key: key.into(),
            value: "v".into(),
            expiry: u64::MAX,
        }
    }

    fn accessed(key: &str) -> RegistryEvent {
        RegistryEvent::Accessed {
            key: key.into(),
            value: "v".into(),
        }
    }

    #[test]
    fn test_counts_accesses() {
        let analytics = AnalyticsListener::new();

        analytics.on_event(&created("a")).unwrap();
        for _ in 0..3 {
            analytics.on_event(&accessed("a")).unwrap();
        }

        assert_eq!(analytics.access_count("a"), 3);
        assert_eq!(analytics.access_count("unknown"), 0);
    }

    #[test]
    fn test_untracked_access_is_ignored() {
        let analytics = AnalyticsListener::new();

        analytics.on_event(&accessed("ghost")).unwrap();
        assert_eq!(analytics.access_count("ghost"), 0);
        assert!(analytics.top(5).is_empty());
    }

    #[test]
    fn test_forgets_removed_and_expired() {
        let analytics = AnalyticsListener::new();

        analytics.on_event(&created("a")).unwrap();
        analytics.on_event(&created("b")).unwrap();
        analytics.on_event(&accessed("a")).unwrap();

        analytics
            .on_event(&RegistryEvent::Removed { key: "a".into() })
            .unwrap();
        analytics
            .on_event(&RegistryEvent::Expired { key: "b".into() })
            .unwrap();

        assert_eq!(analytics.access_count("a"), 0);
        assert!(analytics.top(10).is_empty());
    }

    #[test]
    fn test_top_orders_by_accesses() {
        let analytics = AnalyticsListener::new();

        for (key, hits) in [("a", 1), ("b", 5), ("c", 3)] {
            analytics.on_event(&created(key)).unwrap();
            for _ in 0..hits {
                analytics.on_event(&accessed(key)).unwrap();
            }
        }

        assert_eq!(
            analytics.top(2),
            vec![("b".to_string(), 5), ("c".to_string(), 3)]
        );
    }
}
