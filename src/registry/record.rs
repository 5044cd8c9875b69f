//! Record Module
//!
//! Defines the immutable key/value/expiry triple held by the registry.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Record ==
/// A single registry entry.
///
/// Records are never mutated after creation; they are only removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// The short key
    pub key: String,
    /// The long value the key resolves to
    pub value: String,
    /// Expiration timestamp (Unix seconds)
    pub expiry: u64,
}

impl Record {
    // == Constructor ==
    pub fn new(key: impl Into<String>, value: impl Into<String>, expiry: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expiry,
        }
    }

    // == Is Expired ==
    /// Checks whether the record has expired as of `now`.
    ///
    /// Boundary condition: a record is expired once `now` reaches its expiry,
    /// matching the `expiry <= now` range used by the sweeper.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiry <= now
    }

    // == Time To Live ==
    /// Returns remaining lifetime in seconds as of `now`, saturating at 0.
    pub fn ttl_remaining(&self, now: u64) -> u64 {
        self.expiry.saturating_sub(now)
    }

    /// Expiry rendered as RFC 3339.
    pub fn expires_at(&self) -> String {
        format_timestamp(self.expiry)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Renders Unix seconds as RFC 3339, falling back to the raw number when out of range.
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}
