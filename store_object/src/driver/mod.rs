//! Database drivers
//!
//! `PgDatabase` runs statements on PostgreSQL through sqlx; `MemoryDatabase`
//! keeps tables in process memory for tests and demos.

pub mod memory;
pub mod postgres;

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SCOPE: AtomicUsize = AtomicUsize::new(1);

/// Cache scope unique to one driver instance within the process
pub(crate) fn next_scope(prefix: &str) -> String {
    format!("{}{}", prefix, NEXT_SCOPE.fetch_add(1, Ordering::Relaxed))
}
