//! Trait definitions
//!
//! The storage seam between `ThingStore` and a concrete database.

use crate::entity::Attributes;
use crate::errors::ThingError;
use crate::fields::RawColumn;
use crate::query_builder::{Assignment, Condition, Selection, Where};
use crate::validation::ValidatedTableName;
use async_trait::async_trait;
use std::fmt::Debug;

/// Statement execution against one database
///
/// Rows travel as attribute maps in the shape `to_jsonb` gives them.
#[async_trait]
pub trait Database: Send + Sync + Debug {
    /// Prefix that keeps this database's cache entries apart from others
    /// sharing the process cache
    fn cache_scope(&self) -> &str;

    /// Check that the database answers
    async fn ping(&self) -> Result<(), ThingError>;

    async fn table_exists(&self, table: &ValidatedTableName) -> Result<bool, ThingError>;

    /// Column introspection rows in ordinal order
    async fn fields(&self, table: &ValidatedTableName) -> Result<Vec<RawColumn>, ThingError>;

    async fn get_one(
        &self,
        table: &ValidatedTableName,
        selection: &Selection,
    ) -> Result<Option<Attributes>, ThingError>;

    async fn get_all(
        &self,
        table: &ValidatedTableName,
        selection: &Selection,
    ) -> Result<Vec<Attributes>, ThingError>;

    /// Rows matching `filter`, ignoring any limit or offset
    async fn count(&self, table: &ValidatedTableName, filter: &Where) -> Result<i64, ThingError>;

    /// Insert one row and return it as stored, generated columns included
    async fn insert(
        &self,
        table: &ValidatedTableName,
        assignments: &[Assignment],
    ) -> Result<Attributes, ThingError>;

    /// Returns the number of rows affected
    async fn update(
        &self,
        table: &ValidatedTableName,
        assignments: &[Assignment],
        conditions: &[Condition],
    ) -> Result<u64, ThingError>;

    /// Returns the number of rows removed
    async fn delete(
        &self,
        table: &ValidatedTableName,
        conditions: &[Condition],
    ) -> Result<u64, ThingError>;
}
