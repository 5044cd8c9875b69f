//! Eviction Sweeper
//!
//! Background task that periodically removes expired records from the registry.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{RegistryError, Result};
use crate::events::EventSink;
use crate::registry::{current_timestamp, RegistryStore};

/// Default bound on how long `shutdown` waits for an in-flight sweep.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

// == Sweep Once ==
/// Runs one sweep: evicts every record expired as of `now`.
///
/// Emits one expiration notification per record actually removed and returns
/// how many that was. Keys removed concurrently by someone else are skipped.
pub fn sweep_once(store: &RegistryStore, sink: &dyn EventSink, now: u64) -> usize {
    let mut removed = 0;
    for key in store.list_expired(now) {
        if let Some(record) = store.remove_expired(&key, now) {
            sink.notify_expired(&record.key);
            removed += 1;
        }
    }
    removed
}

enum State {
    Stopped,
    Running {
        shutdown_tx: watch::Sender<bool>,
        handle: JoinHandle<()>,
    },
}

// == Eviction Sweeper ==
/// Recurring eviction task with a `Stopped -> Running -> Stopped` lifecycle.
///
/// # Example
/// ```ignore
/// let sweeper = EvictionSweeper::new(store.clone(), sink.clone(), Duration::from_secs(60))?;
/// sweeper.start();
/// // Later, during shutdown:
/// sweeper.shutdown().await;
/// ```
pub struct EvictionSweeper {
    store: Arc<RegistryStore>,
    sink: Arc<dyn EventSink>,
    frequency: Duration,
    grace: Duration,
    state: Mutex<State>,
}

impl EvictionSweeper {
    /// Creates a stopped sweeper.
    ///
    /// Fails with `InvalidConfiguration` if `frequency` is under one second.
    pub fn new(
        store: Arc<RegistryStore>,
        sink: Arc<dyn EventSink>,
        frequency: Duration,
    ) -> Result<Self> {
        if frequency < Duration::from_secs(1) {
            return Err(RegistryError::InvalidConfiguration(
                "Sweep frequency must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            store,
            sink,
            frequency,
            grace: DEFAULT_SHUTDOWN_GRACE,
            state: Mutex::new(State::Stopped),
        })
    }

    /// Overrides how long `shutdown` waits for an in-flight sweep.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), State::Running { .. })
    }

    /// Spawns the recurring task. Calling it while running is a no-op.
    ///
    /// Must be called inside a Tokio runtime. The first sweep runs immediately.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if matches!(*state, State::Running { .. }) {
            debug!("Eviction sweeper already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sweep_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.sink),
            self.frequency,
            shutdown_rx,
        ));

        info!(
            "Started eviction sweeper with interval of {} seconds",
            self.frequency.as_secs()
        );
        *state = State::Running {
            shutdown_tx,
            handle,
        };
    }

    /// Stops scheduling sweeps and waits for the in-flight one, if any.
    ///
    /// Idempotent. Waits at most the grace period; past that the sweep is
    /// abandoned so shutdown cannot hang.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Stopped);
        let State::Running {
            shutdown_tx,
            handle,
        } = previous
        else {
            return;
        };

        let _ = shutdown_tx.send(true);

        let abort = handle.abort_handle();
        match tokio::time::timeout(self.grace, handle).await {
            Ok(_) => info!("Eviction sweeper stopped"),
            Err(_) => {
                abort.abort();
                warn!(
                    "Eviction sweeper did not finish within {:?}, abandoning in-flight sweep",
                    self.grace
                );
            }
        }
    }
}

// == Sweep Loop ==
async fn sweep_loop(
    store: Arc<RegistryStore>,
    sink: Arc<dyn EventSink>,
    frequency: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(frequency);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("Eviction sweeper received shutdown signal");
                    return;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        // Run on the blocking pool: the sweep takes store locks, and a panic
        // there surfaces as a JoinError instead of killing this loop.
        let store = Arc::clone(&store);
        let sink = Arc::clone(&sink);
        let outcome =
            tokio::task::spawn_blocking(move || sweep_once(&store, sink.as_ref(), current_timestamp()))
                .await;

        match outcome {
            Ok(0) => debug!("Eviction sweep: no expired records found"),
            Ok(removed) => info!("Eviction sweep: removed {} expired records", removed),
            Err(e) => error!(error = %e, "Eviction sweep failed, will retry next interval"),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RecordingSink, RegistryEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    fn fixture() -> (Arc<RegistryStore>, Arc<RecordingSink>) {
        (
            Arc::new(RegistryStore::new()),
            Arc::new(RecordingSink::default()),
        )
    }

    #[test]
    fn test_sweep_once_removes_only_expired() {
        let (store, sink) = fixture();
        store.save("old", "v1", 10).unwrap();
        store.save("edge", "v2", 20).unwrap();
        store.save("new", "v3", 30).unwrap();

        let removed = sweep_once(&store, sink.as_ref(), 20);

        assert_eq!(removed, 2);
        assert!(store.exists("new"));
        assert_eq!(sink.count("expired"), 2);
    }

    #[test]
    fn test_sweep_once_twice_is_noop() {
        let (store, sink) = fixture();
        store.save("old", "v1", 10).unwrap();

        assert_eq!(sweep_once(&store, sink.as_ref(), 10), 1);
        assert_eq!(sweep_once(&store, sink.as_ref(), 10), 0);
        assert_eq!(sink.count("expired"), 1);
    }

    #[test]
    fn test_new_rejects_sub_second_frequency() {
        let (store, sink) = fixture();
        assert!(matches!(
            EvictionSweeper::new(store, sink, Duration::from_millis(500)),
            Err(RegistryError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_record() {
        let (store, sink) = fixture();
        store
            .save("expire_soon", "value", current_timestamp() - 1)
            .unwrap();

        let sweeper = assert_ok!(EvictionSweeper::new(
            store.clone(),
            sink.clone(),
            Duration::from_secs(1)
        ));
        sweeper.start();

        // Wait past one full tick
        tokio::time::sleep(Duration::from_millis(1500)).await;
        sweeper.shutdown().await;

        assert!(!store.exists("expire_soon"), "Expired record should have been evicted");
        assert_eq!(
            sink.events(),
            vec![RegistryEvent::Expired {
                key: "expire_soon".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_sweeper_preserves_live_records() {
        let (store, sink) = fixture();
        store
            .save("long_lived", "value", current_timestamp() + 3600)
            .unwrap();

        let sweeper = EvictionSweeper::new(store.clone(), sink.clone(), Duration::from_secs(1)).unwrap();
        sweeper.start();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        sweeper.shutdown().await;

        assert_eq!(store.get("long_lived").unwrap(), "value");
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_start_and_shutdown_are_idempotent() {
        let (store, sink) = fixture();
        let sweeper = EvictionSweeper::new(store, sink, Duration::from_secs(1)).unwrap();

        assert!(!sweeper.is_running());
        sweeper.start();
        sweeper.start();
        assert!(sweeper.is_running());

        sweeper.shutdown().await;
        sweeper.shutdown().await;
        assert!(!sweeper.is_running());

        // Can be restarted after a full stop
        sweeper.start();
        assert!(sweeper.is_running());
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_sweeps_after_shutdown() {
        let (store, sink) = fixture();
        let sweeper = EvictionSweeper::new(store.clone(), sink.clone(), Duration::from_secs(1)).unwrap();

        sweeper.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        sweeper.shutdown().await;

        store.save("late", "value", current_timestamp() - 1).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(store.exists("late"));
        assert_eq!(sink.count("expired"), 0);
    }

    /// Panics on the first expiration it sees, then behaves.
    #[derive(Default)]
    struct FlakySink {
        calls: AtomicUsize,
        expired: AtomicUsize,
    }

    impl EventSink for FlakySink {
        fn publish(&self, event: RegistryEvent) {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("transient sink failure");
            }
            if matches!(event, RegistryEvent::Expired { .. }) {
                self.expired.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_failed_sweep_does_not_stop_schedule() {
        let store = Arc::new(RegistryStore::new());
        let sink = Arc::new(FlakySink::default());
        store.save("first", "v1", current_timestamp() - 1).unwrap();

        let sweeper = EvictionSweeper::new(store.clone(), sink.clone(), Duration::from_secs(1)).unwrap();
        sweeper.start();

        // First sweep removes "first" and then panics inside the sink
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!store.exists("first"));

        store.save("second", "v2", current_timestamp() - 1).unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        sweeper.shutdown().await;

        assert!(!store.exists("second"), "Schedule should survive a failed sweep");
        assert_eq!(sink.expired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_abandons_slow_sweep() {
        struct SlowSink;

        impl EventSink for SlowSink {
            fn publish(&self, _event: RegistryEvent) {
                std::thread::sleep(Duration::from_millis(800));
            }
        }

        let store = Arc::new(RegistryStore::new());
        store.save("slow", "v", current_timestamp() - 1).unwrap();

        let sweeper = EvictionSweeper::new(store, Arc::new(SlowSink), Duration::from_secs(1))
            .unwrap()
            .with_shutdown_grace(Duration::from_millis(100));
        sweeper.start();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        sweeper.shutdown().await;

        assert!(started.elapsed() < Duration::from_millis(600));
        assert!(!sweeper.is_running());
    }
}
