//! Store Object - the ORM core of thingbase
//!
//! Models implement [`Thing`] and are wrapped in [`Entity`] values; a
//! [`ThingStore`] loads, lists, saves and deletes them through a
//! [`Database`] driver, using column metadata introspected from the table.

pub mod driver;
pub mod entity;
pub mod errors;
pub mod fields;
pub mod helpers;
pub mod prelude;
pub mod query_builder;
pub mod thing_store;
pub mod traits;
pub mod validation;

pub use driver::{MemoryDatabase, PgDatabase};
pub use entity::{Attributes, Entity, EntityState, Metadata, PkValue, ThingList};
pub use errors::ThingError;
pub use fields::{ColumnKey, FieldInfo, FieldMap, PrimaryKey, RawColumn};
pub use query_builder::{
    build_query, Assignment, Condition, ListOptions, QueryOperator, QueryParts, Selection,
    SortOrder, SqlGenerator, Where,
};
pub use thing_store::ThingStore;
pub use traits::{Database, Thing};
pub use validation::{FieldErrors, ValidatedFieldName, ValidatedTableName, ValidationError};

use sqlx::PgPool;

pub type DbPool = PgPool;
