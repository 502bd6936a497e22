//! In-memory driver
//!
//! Tables held in process memory, for tests and demos. Structured
//! conditions are evaluated directly; raw SQL fragments are not supported.
//! Values are stored in the JSON shape `to_jsonb` would produce.

use crate::driver::next_scope;
use crate::entity::Attributes;
use crate::errors::ThingError;
use crate::fields::RawColumn;
use crate::query_builder::{Assignment, Condition, QueryOperator, Selection, SortOrder, Where};
use crate::traits::Database;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use type_mapping::{ColumnKind, PostgresValue};

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<RawColumn>,
    rows: Vec<Attributes>,
    last_id: i64,
}

impl MemoryTable {
    fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.column_name == name)
    }

    fn kind(&self, table: &str, column: &ValidatedFieldName) -> Result<ColumnKind, ThingError> {
        self.column(column.as_str())
            .map(|c| ColumnKind::from_data_type(&c.data_type))
            .ok_or_else(|| {
                ThingError::rejected(table, format!("column \"{}\" does not exist", column))
            })
    }

    fn primary_columns(&self) -> Vec<&RawColumn> {
        self.columns.iter().filter(|c| c.is_primary).collect()
    }

    /// Integer key column filled in when an insert leaves it empty
    fn serial_column(&self) -> Option<String> {
        match self.primary_columns().as_slice() {
            [column] if ColumnKind::from_data_type(&column.data_type).is_integer() => {
                Some(column.column_name.clone())
            }
            _ => None,
        }
    }

    fn matches(&self, table: &str, row: &Attributes, conditions: &[Condition]) -> Result<bool, ThingError> {
        for condition in conditions {
            let kind = self.kind(table, &condition.column)?;
            let stored = row.get(condition.column.as_str()).unwrap_or(&Value::Null);
            if !condition_holds(condition, stored, kind) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn select(&self, table: &str, selection: &Selection) -> Result<Vec<Attributes>, ThingError> {
        let conditions = structured(&selection.filter)?;

        let mut rows = Vec::new();
        for row in &self.rows {
            if self.matches(table, row, conditions)? {
                rows.push(row.clone());
            }
        }

        let mut order = Vec::with_capacity(selection.order_by.len());
        for (column, direction) in &selection.order_by {
            order.push((column.as_str(), self.kind(table, column)?, *direction));
        }
        rows.sort_by(|a, b| compare_rows(a, b, &order));

        let offset = selection.offset.unwrap_or(0).max(0) as usize;
        let rows = rows.into_iter().skip(offset);
        Ok(match selection.limit {
            Some(limit) => rows.take(limit.max(0) as usize).collect(),
            None => rows.collect(),
        })
    }
}

fn structured(filter: &Where) -> Result<&[Condition], ThingError> {
    match filter {
        Where::Conditions(conditions) => Ok(conditions.as_slice()),
        Where::Raw { .. } => Err(ThingError::Unsupported(
            "raw SQL conditions need a SQL database".to_string(),
        )),
    }
}

fn stored_value(value: &Value, kind: ColumnKind) -> PostgresValue {
    PostgresValue::from_json(value).coerce(kind)
}

fn condition_holds(condition: &Condition, stored: &Value, kind: ColumnKind) -> bool {
    if condition.operator == QueryOperator::IsNull {
        return stored.is_null();
    }

    let Some(expected) = &condition.value else {
        return false;
    };
    let actual = stored_value(stored, kind);
    if actual.is_null() {
        return false;
    }

    match condition.operator {
        QueryOperator::Like => match expected {
            PostgresValue::Text(pattern) => actual.like(pattern),
            _ => false,
        },
        QueryOperator::In => match expected {
            PostgresValue::Array(items) => items
                .iter()
                .any(|item| actual.compare(item) == Some(Ordering::Equal)),
            single => actual.compare(single) == Some(Ordering::Equal),
        },
        operator => match actual.compare(expected) {
            Some(ordering) => match operator {
                QueryOperator::Eq => ordering == Ordering::Equal,
                QueryOperator::Ne => ordering != Ordering::Equal,
                QueryOperator::Gt => ordering == Ordering::Greater,
                QueryOperator::Gte => ordering != Ordering::Less,
                QueryOperator::Lt => ordering == Ordering::Less,
                QueryOperator::Lte => ordering != Ordering::Greater,
                _ => false,
            },
            None => operator == QueryOperator::Ne && !expected.is_null(),
        },
    }
}

/// Row ordering with nulls sorting after values, as PostgreSQL does for ASC
fn compare_rows(a: &Attributes, b: &Attributes, order: &[(&str, ColumnKind, SortOrder)]) -> Ordering {
    for (column, kind, direction) in order {
        let left = stored_value(a.get(*column).unwrap_or(&Value::Null), *kind);
        let right = stored_value(b.get(*column).unwrap_or(&Value::Null), *kind);

        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => left.compare(&right).unwrap_or(Ordering::Equal),
        };

        let ordering = match direction {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Value of a simple column default; expressions other than `now()` give null
fn default_value(default: &str, kind: ColumnKind) -> Value {
    let literal = default.split("::").next().unwrap_or(default).trim();

    if let Some(text) = literal.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return PostgresValue::Text(text.replace("''", "'")).coerce(kind).to_json();
    }

    match literal.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "now()" | "current_timestamp" => PostgresValue::Timestamp(chrono::Utc::now())
            .coerce(kind)
            .to_json(),
        _ => match serde_json::from_str::<Value>(literal) {
            Ok(number @ Value::Number(_)) => PostgresValue::from_json(&number).coerce(kind).to_json(),
            _ => Value::Null,
        },
    }
}

/// `Database` backed by tables in process memory
#[derive(Debug)]
pub struct MemoryDatabase {
    tables: RwLock<BTreeMap<String, MemoryTable>>,
    scope: String,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            scope: next_scope("mem"),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create (or replace) an empty table
    pub fn create_table(&self, name: &str, columns: Vec<RawColumn>) {
        self.write().insert(
            name.to_string(),
            MemoryTable {
                columns,
                ..MemoryTable::default()
            },
        );
    }

    pub fn drop_table(&self, name: &str) {
        self.write().remove(name);
    }

    /// Snapshot of a table's rows in insertion order
    pub fn rows(&self, name: &str) -> Vec<Attributes> {
        self.read()
            .get(name)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    fn missing(table: &ValidatedTableName) -> ThingError {
        ThingError::rejected(
            table.as_str(),
            format!("relation \"{}\" does not exist", table),
        )
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    fn cache_scope(&self) -> &str {
        &self.scope
    }

    async fn ping(&self) -> Result<(), ThingError> {
        Ok(())
    }

    async fn table_exists(&self, table: &ValidatedTableName) -> Result<bool, ThingError> {
        Ok(self.read().contains_key(table.as_str()))
    }

    async fn fields(&self, table: &ValidatedTableName) -> Result<Vec<RawColumn>, ThingError> {
        Ok(self
            .read()
            .get(table.as_str())
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn get_one(
        &self,
        table: &ValidatedTableName,
        selection: &Selection,
    ) -> Result<Option<Attributes>, ThingError> {
        let selection = selection.clone().limit(1);
        let rows = self.get_all(table, &selection).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_all(
        &self,
        table: &ValidatedTableName,
        selection: &Selection,
    ) -> Result<Vec<Attributes>, ThingError> {
        let tables = self.read();
        let memory = tables.get(table.as_str()).ok_or_else(|| Self::missing(table))?;
        memory.select(table.as_str(), selection)
    }

    async fn count(&self, table: &ValidatedTableName, filter: &Where) -> Result<i64, ThingError> {
        let tables = self.read();
        let memory = tables.get(table.as_str()).ok_or_else(|| Self::missing(table))?;
        let rows = memory.select(table.as_str(), &Selection::new(filter.clone()))?;
        Ok(rows.len() as i64)
    }

    async fn insert(
        &self,
        table: &ValidatedTableName,
        assignments: &[Assignment],
    ) -> Result<Attributes, ThingError> {
        let name = table.as_str();
        let mut tables = self.write();
        let memory = tables.get_mut(name).ok_or_else(|| Self::missing(table))?;

        let mut row = Attributes::new();
        for assignment in assignments {
            let kind = memory.kind(name, &assignment.column)?;
            row.insert(
                assignment.column.as_str().to_string(),
                assignment.value.clone().coerce(kind).to_json(),
            );
        }

        for column in &memory.columns {
            if !row.contains_key(&column.column_name) {
                let kind = ColumnKind::from_data_type(&column.data_type);
                let value = column
                    .column_default
                    .as_deref()
                    .map(|default| default_value(default, kind))
                    .unwrap_or(Value::Null);
                row.insert(column.column_name.clone(), value);
            }
        }

        let mut serial_id = None;
        if let Some(serial) = memory.serial_column() {
            if row.get(&serial).and_then(Value::as_i64).is_none() {
                row.insert(serial.clone(), Value::from(memory.last_id + 1));
            }
            serial_id = row.get(&serial).and_then(Value::as_i64);
        }

        for column in &memory.columns {
            let is_null = row.get(&column.column_name).map_or(true, Value::is_null);
            if !column.is_nullable && is_null {
                return Err(ThingError::rejected(
                    name,
                    format!("null value in column \"{}\" violates not-null constraint", column.column_name),
                ));
            }
        }

        let key_columns: Vec<String> = memory
            .primary_columns()
            .iter()
            .map(|c| c.column_name.clone())
            .collect();
        if !key_columns.is_empty() {
            let duplicate = memory.rows.iter().any(|existing| {
                key_columns
                    .iter()
                    .all(|column| existing.get(column) == row.get(column))
            });
            if duplicate {
                return Err(ThingError::rejected(
                    name,
                    "duplicate key value violates primary key constraint",
                ));
            }
        }

        if let Some(id) = serial_id {
            memory.last_id = memory.last_id.max(id);
        }
        memory.rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &ValidatedTableName,
        assignments: &[Assignment],
        conditions: &[Condition],
    ) -> Result<u64, ThingError> {
        let name = table.as_str();
        let mut tables = self.write();
        let memory = tables.get_mut(name).ok_or_else(|| Self::missing(table))?;

        let mut values = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let kind = memory.kind(name, &assignment.column)?;
            values.push((
                assignment.column.as_str().to_string(),
                assignment.value.clone().coerce(kind).to_json(),
            ));
        }

        let mut matching = Vec::new();
        for (index, row) in memory.rows.iter().enumerate() {
            if memory.matches(name, row, conditions)? {
                matching.push(index);
            }
        }

        for index in &matching {
            if let Some(row) = memory.rows.get_mut(*index) {
                for (column, value) in &values {
                    row.insert(column.clone(), value.clone());
                }
            }
        }

        Ok(matching.len() as u64)
    }

    async fn delete(
        &self,
        table: &ValidatedTableName,
        conditions: &[Condition],
    ) -> Result<u64, ThingError> {
        let name = table.as_str();
        let mut tables = self.write();
        let memory = tables.get_mut(name).ok_or_else(|| Self::missing(table))?;

        let doomed = memory
            .rows
            .iter()
            .map(|row| memory.matches(name, row, conditions))
            .collect::<Result<Vec<bool>, ThingError>>()?;

        let mut flags = doomed.iter();
        memory.rows.retain(|_| !flags.next().copied().unwrap_or(false));

        Ok(doomed.iter().filter(|removed| **removed).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> ValidatedTableName {
        ValidatedTableName::new("posts").unwrap()
    }

    fn database() -> MemoryDatabase {
        let database = MemoryDatabase::new();
        database.create_table(
            "posts",
            vec![
                RawColumn::new("id", "integer").primary(),
                RawColumn::new("title", "text").not_null(),
                RawColumn::new("views", "integer").default_value("0"),
                RawColumn::new("status", "character varying").default_value("'draft'::character varying"),
            ],
        );
        database
    }

    async fn insert(database: &MemoryDatabase, title: &str, views: i64) -> Attributes {
        database
            .insert(
                &table(),
                &[
                    Assignment::new("title", title).unwrap(),
                    Assignment::new("views", views).unwrap(),
                ],
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_fills_serial_and_defaults() {
        let database = database();
        let row = database
            .insert(&table(), &[Assignment::new("title", "First").unwrap()])
            .await
            .unwrap();

        assert_eq!(row.get("id"), Some(&json!(1)));
        assert_eq!(row.get("views"), Some(&json!(0)));
        assert_eq!(row.get("status"), Some(&json!("draft")));

        let second = insert(&database, "Second", 3).await;
        assert_eq!(second.get("id"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_rows() {
        let database = database();

        let missing_title = database.insert(&table(), &[]).await;
        assert!(matches!(missing_title, Err(ThingError::Rejected { .. })));

        let unknown = database
            .insert(&table(), &[Assignment::new("colour", "red").unwrap()])
            .await;
        assert!(matches!(unknown, Err(ThingError::Rejected { .. })));

        insert(&database, "One", 1).await;
        let duplicate = database
            .insert(
                &table(),
                &[
                    Assignment::new("id", 1i64).unwrap(),
                    Assignment::new("title", "Again").unwrap(),
                ],
            )
            .await;
        assert!(matches!(duplicate, Err(ThingError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_select_filter_order_and_page() {
        let database = database();
        insert(&database, "a", 5).await;
        insert(&database, "b", 1).await;
        insert(&database, "c", 9).await;

        let filter = Where::Conditions(vec![Condition::new(
            "views",
            QueryOperator::Gte,
            Some(PostgresValue::Text("2".to_string())),
        )
        .unwrap()]);

        let selection = Selection {
            filter: filter.clone(),
            order_by: vec![(ValidatedFieldName::new("views").unwrap(), SortOrder::Desc)],
            limit: Some(1),
            offset: Some(1),
        };

        let rows = database.get_all(&table(), &selection).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&json!("a")));

        assert_eq!(database.count(&table(), &filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_raw_where_is_unsupported() {
        let database = database();
        let result = database
            .count(&table(), &Where::raw("views > $1", vec![1i64.into()]))
            .await;
        assert!(matches!(result, Err(ThingError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let database = database();
        insert(&database, "a", 1).await;
        insert(&database, "b", 2).await;

        let key = vec![Condition::eq("id", 2i64).unwrap()];
        let updated = database
            .update(&table(), &[Assignment::new("title", "B").unwrap()], &key)
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(database.rows("posts")[1].get("title"), Some(&json!("B")));

        let removed = database.delete(&table(), &key).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(database.rows("posts").len(), 1);
    }

    #[test]
    fn test_condition_semantics() {
        let like = Condition::from_filter("title", &json!("%ell%")).unwrap();
        assert!(condition_holds(&like, &json!("hello"), ColumnKind::Text));
        assert!(!condition_holds(&like, &json!(null), ColumnKind::Text));

        let ne = Condition::from_filter("views", &json!("!3")).unwrap();
        assert!(condition_holds(&ne, &json!(4), ColumnKind::Integer));
        assert!(!condition_holds(&ne, &json!(3), ColumnKind::Integer));
        assert!(!condition_holds(&ne, &json!(null), ColumnKind::Integer));

        let within = Condition::from_filter("views", &json!([1, 2])).unwrap();
        assert!(condition_holds(&within, &json!(2), ColumnKind::Integer));
        assert!(!condition_holds(&within, &json!(5), ColumnKind::Integer));

        let nothing = Condition::from_filter("views", &json!([])).unwrap();
        assert!(!condition_holds(&nothing, &json!(1), ColumnKind::Integer));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value("0", ColumnKind::SmallInt), json!(0));
        assert_eq!(default_value("'0'::smallint", ColumnKind::SmallInt), json!(0));
        assert_eq!(default_value("false", ColumnKind::Boolean), json!(false));
        assert_eq!(default_value("'it''s'::text", ColumnKind::Text), json!("it's"));
        assert_eq!(
            default_value("nextval('posts_id_seq'::regclass)", ColumnKind::Integer),
            json!(null)
        );
        assert!(default_value("now()", ColumnKind::Timestamp).is_string());
    }
}
