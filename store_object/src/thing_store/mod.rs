//! Model stores
//!
//! `ThingStore<T>` gives a `Thing` its lookups, listings, saves and deletes.

pub mod core;
pub mod find;
pub mod persist;

#[cfg(test)]
mod tests;

pub use self::core::ThingStore;
