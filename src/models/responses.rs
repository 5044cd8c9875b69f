//! Response DTOs for the registry API

use serde::Serialize;

use crate::events::MetricsSnapshot;
use crate::registry::Record;

/// Response body for `POST /api/keys`
#[derive(Debug, Clone, Serialize)]
pub struct CreateKeyResponse {
    pub message: String,
    /// The allocated (or existing) key
    pub key: String,
    pub value: String,
}

impl CreateKeyResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' registered", key),
            key,
            value: value.into(),
        }
    }
}

/// Response body for `GET /api/keys/:key`
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    pub key: String,
    pub value: String,
    /// Expiry in RFC 3339
    pub expires_at: String,
    /// Seconds left before the record becomes eligible for eviction
    pub ttl_remaining: u64,
}

impl ResolveResponse {
    pub fn from_record(record: Record, now: u64) -> Self {
        Self {
            expires_at: record.expires_at(),
            ttl_remaining: record.ttl_remaining(now),
            key: record.key,
            value: record.value,
        }
    }
}

/// Response body for `DELETE /api/keys/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Access count for one key, as reported in `/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyUsage {
    pub key: String,
    pub accesses: u64,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Event counters since startup
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    /// Records currently held by the store, including expired ones not yet swept
    pub live_records: usize,
    /// Most accessed keys, busiest first
    pub top_keys: Vec<KeyUsage>,
}

impl StatsResponse {
    pub fn new(counters: MetricsSnapshot, live_records: usize, top: Vec<(String, u64)>) -> Self {
        Self {
            counters,
            live_records,
            top_keys: top
                .into_iter()
                .map(|(key, accesses)| KeyUsage { key, accesses })
                .collect(),
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
