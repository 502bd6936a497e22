//! Traits for database operations
//!
//! `Thing` is implemented by models, `Database` by drivers.

pub mod database;
pub mod thing;

pub use database::Database;
pub use thing::Thing;
