//! Convenience re-exports for common cache-system usage

pub use crate::errors::CacheError;
pub use crate::manager::{CacheKey, ThingCache};

// Re-export centralized config
pub use config::CacheConfig;

// Common external dependencies
pub use serde::{Deserialize, Serialize};
pub use serde_json;
