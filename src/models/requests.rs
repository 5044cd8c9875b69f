//! Request DTOs for the registry API

use serde::Deserialize;

/// Request body for `POST /api/keys`.
///
/// Only the shape is checked here. The allocator's validation pipeline
/// decides whether the value is acceptable.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKeyRequest {
    /// The long value to register
    pub value: String,
}

impl CreateKeyRequest {
    /// Returns an error message if the request is unusable, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.value.trim().is_empty() {
            return Some("Value cannot be empty".to_string());
        }
        None
    }
}
