//! Lookups and listings

use super::core::ThingStore;
use crate::entity::{Attributes, Entity, EntityState, PkValue, ThingList};
use crate::errors::ThingError;
use crate::fields::PrimaryKey;
use crate::query_builder::{build_query, ListOptions, Selection, Where};
use crate::traits::Thing;
use cache_system::ThingCache;
use serde_json::Value;
use type_mapping::PostgresValue;

/// Key condition map for a lookup value, or `None` when the value cannot
/// address a row of this key
fn key_from_pk(primary_key: &PrimaryKey, pk: PkValue) -> Option<Attributes> {
    match primary_key {
        PrimaryKey::Composite(columns) => {
            let PkValue::Map(values) = pk else {
                return None;
            };

            let key: Attributes = columns
                .iter()
                .filter_map(|column| {
                    values
                        .get(column)
                        .map(|value| (column.clone(), value.clone()))
                })
                .collect();

            (!key.is_empty()).then_some(key)
        }
        PrimaryKey::Single(column) => {
            let value = match pk {
                PkValue::Map(values) if values.len() == 1 => values.into_iter().next()?.1,
                PkValue::Map(_) => return None,
                PkValue::Scalar(value) => value,
            };

            if value.is_null() {
                return None;
            }

            let mut key = Attributes::new();
            key.insert(column.clone(), value);
            Some(key)
        }
    }
}

impl<T: Thing> ThingStore<T> {
    /// Find by primary key
    ///
    /// `pk` is a single value or, for composite keys, a column → value map.
    /// A single-column key also accepts a one-entry map.
    pub async fn by_pk(
        &self,
        pk: impl Into<PkValue>,
        cached: bool,
    ) -> Result<Option<Entity<T>>, ThingError> {
        let pk = pk.into();
        let use_cache = self.use_cache(cached);
        let cache_key = self.lookup_key("byPk", &pk.to_json());

        if use_cache {
            if let Some(row) = self.cached_row(&cache_key) {
                return self.item_object(row, EntityState::Persisted).map(Some);
            }
        }

        let fields = self.fields().await?;
        let Some(primary_key) = fields.primary_key() else {
            return Ok(None);
        };
        let Some(key) = key_from_pk(&primary_key, pk) else {
            return Ok(None);
        };

        let table = self.table()?;
        let conditions = Self::key_conditions(&fields, &key)?;
        let row = self
            .database
            .get_one(&table, &Selection::new(Where::Conditions(conditions)))
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if use_cache {
            ThingCache::set(cache_key, Value::Object(row.clone()));
        }

        self.item_object(row, EntityState::Persisted).map(Some)
    }

    /// First row matching an attribute filter
    ///
    /// With `cached`, the key is built from the filter's words only, so
    /// filters differing just in their operator prefix (`">5"`, `"<5"`)
    /// share one cache entry. Only cache filters that use plain equality.
    pub async fn one_by_attributes(
        &self,
        filter: &Attributes,
        cached: bool,
    ) -> Result<Option<Entity<T>>, ThingError> {
        let use_cache = self.use_cache(cached);
        let cache_key = self.lookup_key("oneByAttributes", &Value::Object(filter.clone()));

        if use_cache {
            if let Some(row) = self.cached_row(&cache_key) {
                return self.item_object(row, EntityState::Persisted).map(Some);
            }
        }

        let where_clause = self.attribute_filter(filter).await?;
        let table = self.table()?;
        let row = self
            .database
            .get_one(&table, &Selection::new(where_clause))
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if use_cache {
            ThingCache::set(cache_key, Value::Object(row.clone()));
        }

        self.item_object(row, EntityState::Persisted).map(Some)
    }

    /// First row matching a raw WHERE fragment with `$n` placeholders
    pub async fn one_by_query(
        &self,
        where_sql: &str,
        values: Vec<PostgresValue>,
    ) -> Result<Option<Entity<T>>, ThingError> {
        let table = self.table()?;
        let row = self
            .database
            .get_one(&table, &Selection::new(Where::raw(where_sql, values)))
            .await?;

        row.map(|row| self.item_object(row, EntityState::Persisted))
            .transpose()
    }

    /// Rows matching an attribute filter, with the total match count
    pub async fn list_by_attributes(
        &self,
        filter: &Attributes,
        options: &ListOptions,
    ) -> Result<ThingList<T>, ThingError> {
        let where_clause = self.attribute_filter(filter).await?;
        self.list_by(where_clause, options).await
    }

    /// Rows matching a raw WHERE fragment, with the total match count
    pub async fn list_by_query(
        &self,
        where_sql: &str,
        values: Vec<PostgresValue>,
        options: &ListOptions,
    ) -> Result<ThingList<T>, ThingError> {
        self.list_by(Where::raw(where_sql, values), options).await
    }

    async fn list_by(&self, filter: Where, options: &ListOptions) -> Result<ThingList<T>, ThingError> {
        let table = self.table()?;
        let selection = Selection::new(filter).with_options(options)?;
        let rows = self.database.get_all(&table, &selection).await?;

        // Without a page window every match is already in `rows`.
        let count = if options.is_paginated() {
            self.database.count(&table, &selection.filter).await?
        } else {
            rows.len() as i64
        };

        Ok(ThingList {
            list: self.items_objects(rows, EntityState::Persisted)?,
            count,
        })
    }

    async fn attribute_filter(&self, filter: &Attributes) -> Result<Where, ThingError> {
        let fields = self.fields().await?;
        let conditions = build_query(filter)?;
        Ok(Where::Conditions(Self::bind_conditions(&fields, conditions)))
    }
}
