//! Convenience re-exports for common store-object usage

// Model and driver traits
pub use crate::traits::{Database, Thing};

// Instances and stores
pub use crate::entity::{Attributes, Entity, EntityState, Metadata, PkValue, ThingList};
pub use crate::thing_store::ThingStore;

// Drivers
pub use crate::driver::{MemoryDatabase, PgDatabase};

// Errors and validation
pub use crate::errors::ThingError;
pub use crate::validation::{FieldErrors, ValidationError};

// Query building
pub use crate::query_builder::{ListOptions, SortOrder};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use sqlx::PgPool;
pub use uuid::Uuid;
