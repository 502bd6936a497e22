//! Unified type mapping between JSON attribute values and PostgreSQL
//! This crate provides the value conversions shared by the thingbase drivers

pub mod compare;
pub mod serialize;
pub mod sql;
pub mod types;

pub use compare::{is_unset_flag, loosely_equal};
pub use sql::ColumnKind;
pub use types::PostgresValue;
