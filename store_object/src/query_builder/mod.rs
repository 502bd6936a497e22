//! Query building
//!
//! The attribute filter DSL, the structured statement inputs passed to a
//! `Database`, and their PostgreSQL rendering.

pub mod builder;
pub mod filter;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;


pub use builder::{Assignment, Selection, Where};
pub use filter::{build_query, Condition, QueryOperator};
pub use ordering::SortOrder;
pub use pagination::ListOptions;
pub use sql_generation::{QueryParts, SqlGenerator, ROW_ALIAS};
