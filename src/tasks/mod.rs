//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Eviction Sweep: Removes expired records at the configured frequency

mod sweeper;

pub use sweeper::{sweep_once, EvictionSweeper};
