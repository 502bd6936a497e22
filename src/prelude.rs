//! Convenience re-exports for common thingbase usage
//!
//! # Example
//!
//! ```rust
//! use thingbase::prelude::*;
//!
//! // Now the coordinator, the model traits and the config types are in scope
//! ```

// Core thingbase components
pub use crate::core::ThingBase;
pub use crate::errors::ThingBaseError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, DatabaseConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export store_object module for direct access to drivers and query types
pub use store_object;

// Re-export cache system
pub use cache_system::ThingCache;
