//! Error types for the key registry
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Registry Error Enum ==
/// Unified error type for the registry and everything layered on top of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Key is already held by a live record
    #[error("Key already exists: {0}")]
    DuplicateKey(String),

    /// Key not present in the registry
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Every candidate key collided
    #[error("Unable to allocate a unique key after {attempts} attempts, try again later")]
    AllocationExhausted { attempts: u32 },

    /// Requested key length is unusable
    #[error("Invalid key length: {0}")]
    InvalidLength(usize),

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Value rejected by the store or the validation pipeline
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Too many lookups of one key in the current window
    #[error("Rate limit exceeded for key: {0}")]
    RateLimited(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match &self {
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::InvalidValue(_) | RegistryError::InvalidLength(_) => {
                StatusCode::BAD_REQUEST
            }
            RegistryError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            RegistryError::AllocationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RegistryError::DuplicateKey(_) | RegistryError::InvalidConfiguration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the registry.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (RegistryError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (RegistryError::InvalidValue("v".into()), StatusCode::BAD_REQUEST),
            (RegistryError::RateLimited("k".into()), StatusCode::TOO_MANY_REQUESTS),
            (
                RegistryError::AllocationExhausted { attempts: 6 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_exhausted_message_mentions_attempts() {
        let error = RegistryError::AllocationExhausted { attempts: 6 };
        assert!(error.to_string().contains("6 attempts"));
    }
}
