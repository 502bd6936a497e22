//! Saving and deleting

use super::core::ThingStore;
use crate::entity::{Attributes, Entity, EntityState, PkValue};
use crate::errors::ThingError;
use crate::helpers::{remove_unchanged_values, split_primary_key};
use crate::traits::Thing;
use serde_json::Value;
use type_mapping::is_unset_flag;

impl<T: Thing> ThingStore<T> {
    /// Insert a new entity or write the changed columns of a persisted one
    ///
    /// Returns `Ok(false)` when the table has no primary key, when nothing
    /// changed, or when an inserted row cannot be read back. Validation
    /// failures leave their messages on the entity and return
    /// `ThingError::Validation`.
    ///
    /// `after_save` runs after an update as well as after an insert.
    pub async fn save(&self, entity: &mut Entity<T>) -> Result<bool, ThingError> {
        let fields = self.fields().await?;
        let Some(primary_key) = fields.primary_key() else {
            return Ok(false);
        };

        entity.run_validation();
        if !entity.errors().is_empty() {
            return Err(ThingError::Validation(entity.errors().clone()));
        }

        entity.before_save();

        let table = self.table()?;
        let values = entity.persistable_values(&fields)?;
        let (key, values) = split_primary_key(&primary_key, values, entity.state());

        match entity.state() {
            EntityState::Persisted => {
                let changed = remove_unchanged_values(values, entity.original());
                if changed.is_empty() {
                    return Ok(false);
                }
                if key.len() != primary_key.columns().len() {
                    return Err(ThingError::MissingPrimaryKey(table.to_string()));
                }

                let assignments = Self::assignments(&fields, &changed)?;
                let conditions = Self::key_conditions(&fields, &key)?;
                let affected = self.database.update(&table, &assignments, &conditions).await?;
                self.invalidate();
                tracing::debug!("[SAVE] Updated {} row(s) of {}", affected, table);

                entity.remember(&changed);
                entity.after_save();
                Ok(true)
            }
            EntityState::New => {
                // Leave generated keys and defaulted columns to the database.
                let values: Attributes = values
                    .into_iter()
                    .filter(|(column, value)| {
                        let generated = fields
                            .get(column)
                            .is_some_and(|field| field.is_primary() || field.has_default());
                        !(value.is_null() && generated)
                    })
                    .collect();

                let assignments = Self::assignments(&fields, &values)?;
                let inserted = self.database.insert(&table, &assignments).await?;
                self.invalidate();
                tracing::debug!("[SAVE] Inserted a row into {}", table);

                let mut lookup = Attributes::new();
                for column in primary_key.columns() {
                    let value = inserted
                        .get(column)
                        .filter(|value| !value.is_null())
                        .or_else(|| key.get(column));
                    if let Some(value) = value {
                        lookup.insert(column.to_string(), value.clone());
                    }
                }

                let Some(stored) = self.by_pk(PkValue::Map(lookup), false).await? else {
                    return Ok(false);
                };

                entity.set_state(EntityState::Persisted);
                entity.set_attributes(stored.original().clone(), true)?;
                entity.after_save();
                Ok(true)
            }
        }
    }

    /// Delete an entity's row, or flag it when the model soft-deletes
    ///
    /// Soft deletes only act on entities whose flag is still unset (`0`,
    /// `"0"` or `false`). Hard deletes only act on persisted entities and
    /// report whether the row is gone afterwards.
    pub async fn delete(&self, entity: &mut Entity<T>) -> Result<bool, ThingError> {
        entity.before_delete();

        if T::SOFT_DELETE {
            let flag = entity.get_attribute(T::SOFT_DELETE_FIELD)?;
            let Some(flag) = flag.filter(is_unset_flag) else {
                return Ok(false);
            };

            let deleted = match flag {
                Value::Bool(_) => Value::Bool(true),
                Value::String(_) => Value::from("1"),
                _ => Value::from(1),
            };
            entity.set_attribute(T::SOFT_DELETE_FIELD, deleted)?;

            if self.save(entity).await? {
                entity.after_delete();
                return Ok(true);
            }
            return Ok(false);
        }

        let fields = self.fields().await?;
        let Some(primary_key) = fields.primary_key() else {
            return Ok(false);
        };
        if entity.is_new() {
            return Ok(false);
        }

        let table = self.table()?;
        let values = entity.persistable_values(&fields)?;
        let (key, _) = split_primary_key(&primary_key, values, EntityState::Persisted);
        if key.len() != primary_key.columns().len() {
            return Err(ThingError::MissingPrimaryKey(table.to_string()));
        }

        let conditions = Self::key_conditions(&fields, &key)?;
        let removed = self.database.delete(&table, &conditions).await?;
        self.invalidate();
        tracing::debug!("[DELETE] Removed {} row(s) of {}", removed, table);

        entity.after_delete();

        let remaining = self.by_pk(PkValue::Map(key), false).await?;
        Ok(remaining.is_none())
    }
}
