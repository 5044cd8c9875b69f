//! Request and Response models for the registry API
//!
//! DTOs serialized to and from HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::CreateKeyRequest;
pub use responses::{
    CreateKeyResponse, DeleteResponse, ErrorResponse, HealthResponse, KeyUsage, ResolveResponse,
    StatsResponse,
};
