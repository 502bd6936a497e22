//! # thingbase
//!
//! An ActiveRecord-style model layer for PostgreSQL. A model is a plain
//! serde struct implementing [`Thing`](store_object::Thing); its columns are
//! introspected from the table, and a [`ThingStore`](store_object::ThingStore)
//! gives it lookups, listings, saving and deleting with lifecycle hooks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use thingbase::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Option<i64>,
//!     pub name: String,
//!     pub email: String,
//! }
//!
//! impl Thing for User {
//!     const TABLE: &'static str = "users";
//!
//!     fn validate(&self, errors: &mut FieldErrors) {
//!         if !self.email.contains('@') {
//!             errors.add("email", "Email address is not valid");
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "cms".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let thingbase = ThingBase::new(config).await?;
//!     let users = thingbase.store::<User>();
//!
//!     let mut user = Entity::new(User {
//!         name: "John Doe".to_string(),
//!         email: "john@example.com".to_string(),
//!         ..User::default()
//!     });
//!     users.save(&mut user).await?;
//!     println!("Created user {:?}", user.id);
//!
//!     if let Some(id) = user.id {
//!         let found = users.by_pk(id, true).await?;
//!         println!("Found: {:?}", found.map(|u| u.into_model()));
//!     }
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::ThingBase;
pub use errors::ThingBaseError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, DatabaseConfig};

// Re-export internal crates used by the public API
pub use cache_system;
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
