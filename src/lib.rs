//! Shortkey - a short-key registry
//!
//! Maps generated short keys to long values with guaranteed key uniqueness,
//! reverse lookup by value and time-based eviction.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod keygen;
pub mod models;
pub mod registry;
pub mod service;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{RegistryError, Result};
pub use registry::{Record, RegistryStore};
pub use service::{Allocator, KeyService};
pub use tasks::EvictionSweeper;
