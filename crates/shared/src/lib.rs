//! # Rolelens Shared
//!
//! Common types used across all Rolelens crates: the snapshot data model,
//! the error taxonomy, configuration and the resolution observer.

pub mod error;
pub mod role;
pub mod policy;
pub mod snapshot;
pub mod config;
pub mod observer;

// Re-exports
pub use error::*;
pub use role::*;
pub use policy::*;
pub use snapshot::*;
pub use config::*;
pub use observer::*;
