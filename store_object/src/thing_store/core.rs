use crate::entity::{Attributes, Entity, EntityState};
use crate::errors::ThingError;
use crate::fields::{FieldMap, PrimaryKey};
use crate::helpers::{fields_by_raw, values_to_line};
use crate::query_builder::{Assignment, Condition};
use crate::traits::{Database, Thing};
use crate::validation::ValidatedTableName;
use cache_system::{CacheKey, ThingCache};
use config::CacheConfig;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// CRUD for one model type over a `Database`
///
/// Field metadata is memoized in the process cache per database and table;
/// lookups made with `cached = true` are memoized per model until the next
/// write through any store of the same model.
#[derive(Clone)]
pub struct ThingStore<T: Thing> {
    pub(crate) database: Arc<dyn Database>,
    pub(crate) cache_config: CacheConfig,
    pub(crate) _phantom: PhantomData<T>,
}

impl<T: Thing> std::fmt::Debug for ThingStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingStore")
            .field("model", &T::model_name())
            .field("table", &T::TABLE)
            .field("cache_enabled", &self.cache_config.enabled)
            .finish()
    }
}

impl<T: Thing> ThingStore<T> {
    pub fn new(database: Arc<dyn Database>, cache_config: CacheConfig) -> Self {
        Self {
            database,
            cache_config,
            _phantom: PhantomData,
        }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    pub(crate) fn table(&self) -> Result<ValidatedTableName, ThingError> {
        ValidatedTableName::new(T::TABLE).map_err(|source| ThingError::InvalidTable {
            model: T::model_name(),
            source,
        })
    }

    /// Prefix shared by every cached lookup of this model
    pub(crate) fn model_key(&self) -> CacheKey {
        CacheKey::new(self.database.cache_scope()).push(std::any::type_name::<T>())
    }

    pub(crate) fn lookup_key(&self, operation: &str, value: &Value) -> CacheKey {
        self.model_key()
            .push(operation)
            .push(values_to_line(value, &self.cache_config.key_separator))
    }

    pub(crate) fn use_cache(&self, cached: bool) -> bool {
        cached && self.cache_config.enabled
    }

    /// Row previously memoized under `key`
    pub(crate) fn cached_row(&self, key: &CacheKey) -> Option<Attributes> {
        match ThingCache::get(key.as_str()) {
            Some(Value::Object(row)) => {
                tracing::trace!("[CACHE] Hit {}", key);
                Some(row)
            }
            _ => None,
        }
    }

    /// Forget this model's cached lookups after a write
    pub(crate) fn invalidate(&self) {
        ThingCache::unset_prefix(&self.model_key().prefix());
    }

    /// Column metadata of the model's table, introspected once per process
    pub async fn fields(&self) -> Result<FieldMap, ThingError> {
        let table = self.table()?;
        let key = CacheKey::new(self.database.cache_scope())
            .push("fields")
            .push(table.as_str());

        if let Some(fields) = ThingCache::get_as::<FieldMap>(key.as_str())? {
            return Ok(fields);
        }

        if !self.database.table_exists(&table).await? {
            return Err(ThingError::TableNotFound(table.to_string()));
        }

        let fields = fields_by_raw(self.database.fields(&table).await?);
        tracing::debug!("[FIELDS] Cached {} columns of {}", fields.len(), table);
        ThingCache::set_as(key, &fields)?;

        Ok(fields)
    }

    pub async fn primary_key(&self) -> Result<Option<PrimaryKey>, ThingError> {
        Ok(self.fields().await?.primary_key())
    }

    /// Whether the table has a column called `name`
    pub async fn is_field(&self, name: &str) -> Result<bool, ThingError> {
        Ok(self.fields().await?.contains(name))
    }

    /// Bind each condition on a known column to that column's type
    pub(crate) fn bind_conditions(fields: &FieldMap, conditions: Vec<Condition>) -> Vec<Condition> {
        conditions
            .into_iter()
            .map(|condition| match fields.get(condition.column.as_str()) {
                Some(field) => condition.bind(field),
                None => condition,
            })
            .collect()
    }

    /// Equality conditions for a primary key map
    pub(crate) fn key_conditions(fields: &FieldMap, key: &Attributes) -> Result<Vec<Condition>, ThingError> {
        let conditions = key
            .iter()
            .map(|(column, value)| Condition::eq(column, value.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::bind_conditions(fields, conditions))
    }

    pub(crate) fn assignments(fields: &FieldMap, values: &Attributes) -> Result<Vec<Assignment>, ThingError> {
        values
            .iter()
            .map(|(column, value)| -> Result<Assignment, ThingError> {
                let assignment = Assignment::new(column, value.clone())?;
                Ok(match fields.get(column) {
                    Some(field) => assignment.bind(field),
                    None => assignment,
                })
            })
            .collect()
    }

    /// Build an entity from a row and run the model's `item_extension`
    pub fn item_object(&self, row: Attributes, state: EntityState) -> Result<Entity<T>, ThingError> {
        let mut entity = Entity::<T>::from_row(row, state)?;
        entity.extend();
        Ok(entity)
    }

    pub fn items_objects(
        &self,
        rows: Vec<Attributes>,
        state: EntityState,
    ) -> Result<Vec<Entity<T>>, ThingError> {
        rows.into_iter()
            .map(|row| self.item_object(row, state))
            .collect()
    }
}
