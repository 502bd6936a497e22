//! Process-wide cache for thingbase
//!
//! This crate provides the static key/value store used to memoize table
//! field metadata and opt-in model lookups for the lifetime of the process.

pub mod errors;
pub mod manager;
pub mod prelude;

// Re-export centralized config
pub use config::CacheConfig;

pub use errors::CacheError;
pub use manager::{CacheKey, ThingCache};
