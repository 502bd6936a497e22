//! Trait definitions
//!
//! The `Thing` trait models implement to gain CRUD behavior.

use crate::entity::Metadata;
use crate::validation::FieldErrors;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A model backed by one database table
///
/// The struct's serde fields are its column-backed attributes. Fields the
/// table does not have are never written; columns the struct does not have
/// are kept in the entity's metadata.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use store_object::{FieldErrors, Thing};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// pub struct Article {
///     pub id: Option<i64>,
///     pub title: String,
///     pub deleted: i16,
/// }
///
/// impl Thing for Article {
///     const TABLE: &'static str = "articles";
///     const SOFT_DELETE: bool = true;
///
///     fn validate(&self, errors: &mut FieldErrors) {
///         if self.title.is_empty() {
///             errors.add("title", "Title is required");
///         }
///     }
/// }
/// ```
pub trait Thing:
    Clone + Default + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Table the model is stored in
    const TABLE: &'static str;

    /// Delete by flagging `SOFT_DELETE_FIELD` instead of removing the row
    const SOFT_DELETE: bool = false;

    const SOFT_DELETE_FIELD: &'static str = "deleted";

    /// Short type name, used in errors and logs
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Record field errors; any error aborts the save
    fn validate(&self, _errors: &mut FieldErrors) {}

    fn before_save(&mut self) {}

    fn after_save(&self) {}

    fn before_delete(&mut self) {}

    fn after_delete(&self) {}

    /// Runs on every entity built from a database row
    fn item_extension(&mut self, _metadata: &mut Metadata) {}
}
