//! API Module
//!
//! HTTP handlers and routing for the registry REST API.
//!
//! # Endpoints
//! - `POST /api/keys` - Register a value, returns its key
//! - `GET /api/keys/:key` - Resolve a key
//! - `DELETE /api/keys/:key` - Delete a key
//! - `GET /stats` - Event counters and live record count
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
