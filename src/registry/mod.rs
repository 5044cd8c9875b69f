//! Registry Module
//!
//! Provides the concurrent, expiry-indexed key registry.

mod expiry;
mod record;
mod store;


// Re-export public types
pub use expiry::ExpiryIndex;
pub use record::{current_timestamp, format_timestamp, Record};
pub use store::RegistryStore;
