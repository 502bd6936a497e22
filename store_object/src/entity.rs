//! Model instances
//!
//! `Entity<T>` wraps a typed model together with the ad hoc metadata the
//! struct has no field for, the attribute snapshot taken when it was loaded,
//! its persistence state and the errors of the last validation.

use crate::errors::ThingError;
use crate::fields::FieldMap;
use crate::traits::Thing;
use crate::validation::FieldErrors;
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

/// Column name → value
pub type Attributes = Map<String, Value>;

/// Non-column values attached to an entity
pub type Metadata = Map<String, Value>;

/// Whether a save inserts or updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    #[default]
    New,
    Persisted,
}

/// Serialize a model into its attribute map
pub(crate) fn to_attributes<T: Thing>(model: &T) -> Result<Attributes, ThingError> {
    match serde_json::to_value(model)? {
        Value::Object(map) => Ok(map),
        _ => Err(ThingError::NotAnObject(T::model_name())),
    }
}

#[derive(Debug, Clone)]
pub struct Entity<T: Thing> {
    model: T,
    metadata: Metadata,
    original: Attributes,
    state: EntityState,
    errors: FieldErrors,
}

impl<T: Thing> Entity<T> {
    /// A new, not yet inserted entity
    pub fn new(model: T) -> Self {
        Self {
            model,
            metadata: Metadata::new(),
            original: Attributes::new(),
            state: EntityState::New,
            errors: FieldErrors::new(),
        }
    }

    /// Build an entity from a database row; the row becomes the snapshot
    pub fn from_row(row: Attributes, state: EntityState) -> Result<Self, ThingError> {
        let mut entity = Self::new(T::default());
        entity.state = state;
        entity.set_attributes(row, true)?;
        Ok(entity)
    }

    /// Set one value, on the model when it has that field, otherwise in metadata
    ///
    /// A value of the wrong type for a model field is an error and leaves the
    /// entity unchanged.
    pub fn set_attribute(&mut self, key: &str, value: Value) -> Result<(), ThingError> {
        let mut attributes = to_attributes(&self.model)?;

        if attributes.contains_key(key) {
            attributes.insert(key.to_string(), value);
            self.model = serde_json::from_value(Value::Object(attributes))?;
            self.metadata.remove(key);
            return Ok(());
        }

        // Fields skipped while serializing (e.g. a `None` behind
        // `skip_serializing_if`) only show up once they hold a value.
        attributes.insert(key.to_string(), value.clone());
        if let Ok(model) = serde_json::from_value::<T>(Value::Object(attributes)) {
            if to_attributes(&model)?.contains_key(key) {
                self.model = model;
                self.metadata.remove(key);
                return Ok(());
            }
        }

        self.metadata.insert(key.to_string(), value);
        Ok(())
    }

    /// Set several values; with `with_default` they also become the snapshot
    /// that later saves are diffed against
    pub fn set_attributes(&mut self, values: Attributes, with_default: bool) -> Result<(), ThingError> {
        let mut attributes = to_attributes(&self.model)?;
        let mut others = Vec::new();

        for (key, value) in values {
            if with_default {
                self.original.insert(key.clone(), value.clone());
            }

            if attributes.contains_key(&key) {
                self.metadata.remove(&key);
                attributes.insert(key, value);
            } else {
                others.push((key, value));
            }
        }

        self.model = serde_json::from_value(Value::Object(attributes))?;

        for (key, value) in others {
            self.set_attribute(&key, value)?;
        }

        Ok(())
    }

    /// Model field value, falling back to metadata; `None` when neither has it
    pub fn get_attribute(&self, key: &str) -> Result<Option<Value>, ThingError> {
        let attributes = to_attributes(&self.model)?;

        let value = attributes
            .get(key)
            .filter(|value| !value.is_null())
            .or_else(|| self.metadata.get(key))
            .or_else(|| attributes.get(key))
            .cloned();

        Ok(value)
    }

    /// Model fields, plus metadata when `with_metadata` is set
    pub fn get_attributes(&self, with_metadata: bool) -> Result<Attributes, ThingError> {
        let mut attributes = to_attributes(&self.model)?;

        if with_metadata {
            for (key, value) in &self.metadata {
                attributes.insert(key.clone(), value.clone());
            }
        }

        Ok(attributes)
    }

    /// Values to write: model fields and column-named metadata, limited to
    /// columns the table has
    pub(crate) fn persistable_values(&self, fields: &FieldMap) -> Result<Attributes, ThingError> {
        let attributes = self.get_attributes(true)?;

        Ok(attributes
            .into_iter()
            .filter(|(key, _)| fields.contains(key))
            .collect())
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }

    /// Run the model's validation into the entity's error list
    pub(crate) fn run_validation(&mut self) {
        self.errors.clear();
        self.model.validate(&mut self.errors);
    }

    pub fn is_new(&self) -> bool {
        self.state == EntityState::New
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    /// Attribute values as last loaded or saved
    pub fn original(&self) -> &Attributes {
        &self.original
    }

    pub(crate) fn remember(&mut self, values: &Attributes) {
        for (key, value) in values {
            self.original.insert(key.clone(), value.clone());
        }
    }

    pub fn model(&self) -> &T {
        &self.model
    }

    pub fn into_model(self) -> T {
        self.model
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Run the model's row hook with access to the metadata
    pub(crate) fn extend(&mut self) {
        self.model.item_extension(&mut self.metadata);
    }
}

impl<T: Thing> Deref for Entity<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.model
    }
}

impl<T: Thing> DerefMut for Entity<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.model
    }
}

impl<T: Thing> From<T> for Entity<T> {
    fn from(model: T) -> Self {
        Self::new(model)
    }
}

/// One page of a listing plus the number of rows matching overall
#[derive(Debug, Clone)]
pub struct ThingList<T: Thing> {
    pub list: Vec<Entity<T>>,
    pub count: i64,
}

impl<T: Thing> ThingList<T> {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Primary key lookup value: a single value, or column → value for
/// composite keys
#[derive(Debug, Clone, PartialEq)]
pub enum PkValue {
    Scalar(Value),
    Map(Attributes),
}

impl PkValue {
    pub fn to_json(&self) -> Value {
        match self {
            PkValue::Scalar(value) => value.clone(),
            PkValue::Map(map) => Value::Object(map.clone()),
        }
    }
}

impl From<Value> for PkValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => PkValue::Map(map),
            other => PkValue::Scalar(other),
        }
    }
}

impl From<Attributes> for PkValue {
    fn from(map: Attributes) -> Self {
        PkValue::Map(map)
    }
}

impl From<i32> for PkValue {
    fn from(value: i32) -> Self {
        PkValue::Scalar(Value::from(value))
    }
}

impl From<i64> for PkValue {
    fn from(value: i64) -> Self {
        PkValue::Scalar(Value::from(value))
    }
}

impl From<&str> for PkValue {
    fn from(value: &str) -> Self {
        PkValue::Scalar(Value::from(value))
    }
}

impl From<String> for PkValue {
    fn from(value: String) -> Self {
        PkValue::Scalar(Value::from(value))
    }
}

impl From<Uuid> for PkValue {
    fn from(value: Uuid) -> Self {
        PkValue::Scalar(Value::String(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Option<i64>,
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pinned: Option<bool>,
    }

    impl Thing for Note {
        const TABLE: &'static str = "notes";

        fn validate(&self, errors: &mut FieldErrors) {
            if self.title.is_empty() {
                errors.add("title", "Title is required");
            }
        }
    }

    fn attributes(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_set_attribute_routes_to_model_or_metadata() {
        let mut note = Entity::new(Note::default());
        note.set_attribute("title", json!("Hello")).unwrap();
        note.set_attribute("colour", json!("red")).unwrap();

        assert_eq!(note.title, "Hello");
        assert_eq!(note.metadata().get("colour"), Some(&json!("red")));
        assert!(!note.metadata().contains_key("title"));
    }

    #[test]
    fn test_set_attribute_reaches_skipped_fields() {
        let mut note = Entity::new(Note::default());
        note.set_attribute("pinned", json!(true)).unwrap();
        assert_eq!(note.pinned, Some(true));
        assert!(note.metadata().is_empty());
    }

    #[test]
    fn test_set_attribute_type_mismatch() {
        let mut note = Entity::new(Note::default());
        note.set_attribute("title", json!("Kept")).unwrap();

        let result = note.set_attribute("title", json!({"not": "text"}));
        assert!(matches!(result, Err(ThingError::Serialization(_))));
        assert_eq!(note.title, "Kept");
    }

    #[test]
    fn test_from_row_takes_snapshot() {
        let row = attributes(json!({"id": 3, "title": "Loaded", "views": 9}));
        let note = Entity::<Note>::from_row(row.clone(), EntityState::Persisted).unwrap();

        assert!(!note.is_new());
        assert_eq!(note.id, Some(3));
        assert_eq!(note.metadata().get("views"), Some(&json!(9)));
        assert_eq!(note.original(), &row);
    }

    #[test]
    fn test_get_attribute_prefers_model_values() {
        let mut note = Entity::new(Note::default());
        note.set_attribute("title", json!("Hi")).unwrap();
        note.metadata_mut().insert("extra".to_string(), json!(1));

        assert_eq!(note.get_attribute("title").unwrap(), Some(json!("Hi")));
        assert_eq!(note.get_attribute("extra").unwrap(), Some(json!(1)));
        assert_eq!(note.get_attribute("id").unwrap(), Some(Value::Null));
        assert_eq!(note.get_attribute("missing").unwrap(), None);
    }

    #[test]
    fn test_get_attributes_with_and_without_metadata() {
        let mut note = Entity::new(Note {
            id: Some(1),
            title: "A".to_string(),
            pinned: None,
        });
        note.set_attribute("extra", json!(true)).unwrap();

        let without = note.get_attributes(false).unwrap();
        assert_eq!(without, attributes(json!({"id": 1, "title": "A"})));

        let with = note.get_attributes(true).unwrap();
        assert_eq!(with.get("extra"), Some(&json!(true)));
    }

    #[test]
    fn test_validation_fills_errors() {
        let mut note = Entity::new(Note::default());
        note.run_validation();
        assert_eq!(note.error("title"), Some("Title is required"));

        note.title = "Now valid".to_string();
        note.run_validation();
        assert!(note.errors().is_empty());
    }

    #[test]
    fn test_pk_value_conversions() {
        assert_eq!(PkValue::from(5), PkValue::Scalar(json!(5)));
        assert_eq!(PkValue::from("abc"), PkValue::Scalar(json!("abc")));
        assert_eq!(
            PkValue::from(json!({"a": 1})),
            PkValue::Map(attributes(json!({"a": 1})))
        );
        assert_eq!(PkValue::from(json!({"a": 1})).to_json(), json!({"a": 1}));
    }
}
