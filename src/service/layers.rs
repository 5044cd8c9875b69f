//! Service Layers
//!
//! Stages that wrap another [`KeyService`]: a lookup cache and a per-key
//! rate limiter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::KeyService;
use crate::error::{RegistryError, Result};
use crate::registry::{current_timestamp, Record};

/// Cache size at which expired entries are purged before inserting.
const CACHE_PURGE_THRESHOLD: usize = 10_000;

/// Tracked rate-limit windows at which stale ones are first purged.
const WINDOW_PURGE_THRESHOLD: usize = 10_000;

// == Caching Service ==
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Record>,
    /// Bumped on every invalidation. A miss only populates the cache if no
    /// invalidation happened while it was reading the inner stage.
    epoch: u64,
}

impl CacheState {
    fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
        self.epoch += 1;
    }
}

/// Serves repeated lookups from memory.
///
/// A cached record past its expiry counts as a miss, so the cache never
/// outlives what the sweeper would have evicted. A lookup issued after a
/// delete through this layer has returned never sees the deleted record.
pub struct CachingService {
    inner: Arc<dyn KeyService>,
    state: RwLock<CacheState>,
}

impl CachingService {
    pub fn new(inner: Arc<dyn KeyService>) -> Self {
        Self {
            inner,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.state.read().entries.len()
    }

    fn lookup(&self, key: &str, now: u64) -> Option<Record> {
        self.state
            .read()
            .entries
            .get(key)
            .filter(|record| !record.is_expired_at(now))
            .cloned()
    }

    /// Inserts `record` unless the cache was invalidated since `epoch`.
    fn store(&self, record: Record, epoch: u64, now: u64) {
        let mut state = self.state.write();
        if state.epoch != epoch {
            debug!(key = %record.key, "Cache invalidated during lookup, not caching");
            return;
        }

        if state.entries.len() >= CACHE_PURGE_THRESHOLD {
            state.entries.retain(|_, cached| !cached.is_expired_at(now));
            if state.entries.len() >= CACHE_PURGE_THRESHOLD {
                state.entries.clear();
            }
        }
        state.entries.insert(record.key.clone(), record);
    }
}

impl KeyService for CachingService {
    fn shorten(&self, value: &str) -> Result<String> {
        let key = self.inner.shorten(value)?;
        // A random key can be reissued once its previous holder expired
        self.state.write().invalidate(&key);
        Ok(key)
    }

    fn resolve(&self, key: &str) -> Result<Record> {
        let now = current_timestamp();
        if let Some(record) = self.lookup(key, now) {
            debug!(key, "Cache hit");
            return Ok(record);
        }

        let epoch = self.state.read().epoch;
        let record = self.inner.resolve(key)?;
        if !record.is_expired_at(now) {
            self.store(record.clone(), epoch, now);
        }
        Ok(record)
    }

    fn delete(&self, key: &str) -> bool {
        // Inner first: invalidating before the record is gone would let a
        // concurrent miss cache it again.
        let removed = self.inner.delete(key);
        self.state.write().invalidate(key);
        removed
    }
}

// == Rate Limiting Service ==
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
struct Windows {
    by_key: HashMap<String, Window>,
    /// Size at which the next purge runs. Doubles past the survivors so a
    /// map full of live windows is not rescanned on every call.
    purge_at: usize,
}

/// Caps lookups of each key to `limit` per fixed window.
pub struct RateLimitingService {
    inner: Arc<dyn KeyService>,
    limit: u32,
    window: Duration,
    windows: Mutex<Windows>,
}

impl RateLimitingService {
    pub fn new(inner: Arc<dyn KeyService>, limit: u32, window: Duration) -> Self {
        Self {
            inner,
            limit,
            window,
            windows: Mutex::new(Windows {
                by_key: HashMap::new(),
                purge_at: WINDOW_PURGE_THRESHOLD,
            }),
        }
    }

    /// Keys with a tracked window, stale ones included until the next purge.
    pub fn tracked_windows(&self) -> usize {
        self.windows.lock().by_key.len()
    }

    fn admit(&self, key: &str) -> Result<()> {
        let now = Instant::now();
        let mut guard = self.windows.lock();
        let windows = &mut *guard;

        if windows.by_key.len() >= windows.purge_at {
            let span = self.window;
            windows
                .by_key
                .retain(|_, w| now.duration_since(w.started) < span);
            windows.purge_at = (windows.by_key.len() * 2).max(WINDOW_PURGE_THRESHOLD);
            debug!(
                remaining = windows.by_key.len(),
                next_purge_at = windows.purge_at,
                "Purged stale rate-limit windows"
            );
        }

        let window = windows.by_key.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= self.limit {
            debug!(key, limit = self.limit, "Rate limit reached");
            return Err(RegistryError::RateLimited(key.to_string()));
        }
        window.count += 1;
        Ok(())
    }
}

impl KeyService for RateLimitingService {
    fn shorten(&self, value: &str) -> Result<String> {
        self.inner.shorten(value)
    }

    fn resolve(&self, key: &str) -> Result<Record> {
        self.admit(key)?;
        self.inner.resolve(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.windows.lock().by_key.remove(key);
        self.inner.delete(key)
    }
}
