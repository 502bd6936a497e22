//! PostgreSQL driver
//!
//! Executes the statements rendered by `SqlGenerator` on a sqlx pool. Rows
//! are selected as a single `to_jsonb` column so that any table can be read
//! without a compile-time row type.

use crate::driver::next_scope;
use crate::entity::Attributes;
use crate::errors::ThingError;
use crate::fields::RawColumn;
use crate::query_builder::{Assignment, Condition, QueryParts, Selection, SqlGenerator, Where};
use crate::traits::Database;
use crate::validation::ValidatedTableName;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use type_mapping::PostgresValue;

const FIELDS_SQL: &str = r#"
SELECT c.column_name::text AS column_name,
       c.data_type::text AS data_type,
       c.udt_name::text AS udt_name,
       (c.is_nullable::text = 'YES') AS is_nullable,
       c.column_default::text AS column_default,
       EXISTS (
           SELECT 1
           FROM information_schema.table_constraints tc
           JOIN information_schema.key_column_usage kcu
             ON kcu.constraint_name = tc.constraint_name
            AND kcu.table_schema = tc.table_schema
            AND kcu.table_name = tc.table_name
           WHERE tc.constraint_type = 'PRIMARY KEY'
             AND tc.table_schema = c.table_schema
             AND tc.table_name = c.table_name
             AND kcu.column_name = c.column_name
       ) AS is_primary
FROM information_schema.columns c
WHERE c.table_schema = current_schema()
  AND c.table_name = $1
ORDER BY c.ordinal_position
"#;

const TABLE_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_name = $1)";

// Bind one PostgresValue onto a sqlx query
macro_rules! bind_postgres_value {
    ($query:expr, $value:expr) => {
        match $value {
            PostgresValue::Text(s) => $query.bind(s),
            PostgresValue::SmallInt(v) => $query.bind(v),
            PostgresValue::Integer(v) => $query.bind(v),
            PostgresValue::BigInt(v) => $query.bind(v),
            PostgresValue::Float(v) => $query.bind(v),
            // bound as text; the placeholder cast turns it into numeric
            PostgresValue::Decimal(s) => $query.bind(s),
            PostgresValue::Boolean(b) => $query.bind(b),
            PostgresValue::Uuid(u) => $query.bind(u),
            PostgresValue::Timestamp(ts) => $query.bind(ts),
            PostgresValue::Date(d) => $query.bind(d),
            PostgresValue::Json(v) => $query.bind(sqlx::types::Json(v)),
            PostgresValue::Array(items) => match integer_items(&items) {
                Some(integers) => $query.bind(integers),
                None => $query.bind(text_items(items)),
            },
            PostgresValue::Null => $query.bind(Option::<String>::None),
        }
    };
}

fn integer_items(items: &[PostgresValue]) -> Option<Vec<i64>> {
    items.iter().map(PostgresValue::as_i64).collect()
}

fn text_items(items: Vec<PostgresValue>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| match item {
            PostgresValue::Text(s) => s,
            other => match other.to_json() {
                Value::String(s) => s,
                json => json.to_string(),
            },
        })
        .collect()
}

/// `Database` over a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
    scope: String,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            scope: next_scope("pg"),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn query(parts: &QueryParts) -> Query<'_, Postgres, PgArguments> {
        let mut query = sqlx::query(&parts.sql);
        for value in parts.values.iter().cloned() {
            query = bind_postgres_value!(query, value);
        }
        query
    }

    fn record(table: &ValidatedTableName, row: &PgRow) -> Result<Attributes, ThingError> {
        let record: Value = row
            .try_get("record")
            .map_err(|e| ThingError::database(table.as_str(), "decode", e))?;

        match record {
            Value::Object(map) => Ok(map),
            other => Err(ThingError::rejected(
                table.as_str(),
                format!("expected a row object, got {}", other),
            )),
        }
    }

    fn log(operation: &str, table: &ValidatedTableName, parts: &QueryParts) {
        tracing::debug!("[{}] Table: {}", operation, table);
        tracing::debug!("[{}] SQL: {}", operation, parts.sql);
        tracing::trace!("[{}] Params: {:?}", operation, parts.values);
    }
}

#[async_trait]
impl Database for PgDatabase {
    fn cache_scope(&self) -> &str {
        &self.scope
    }

    async fn ping(&self) -> Result<(), ThingError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ThingError::database("", "ping", e))?;
        Ok(())
    }

    async fn table_exists(&self, table: &ValidatedTableName) -> Result<bool, ThingError> {
        sqlx::query_scalar::<_, bool>(TABLE_EXISTS_SQL)
            .bind(table.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "table_exists", e))
    }

    async fn fields(&self, table: &ValidatedTableName) -> Result<Vec<RawColumn>, ThingError> {
        tracing::debug!("[FIELDS] Table: {}", table);

        sqlx::query_as::<_, RawColumn>(FIELDS_SQL)
            .bind(table.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "fields", e))
    }

    async fn get_one(
        &self,
        table: &ValidatedTableName,
        selection: &Selection,
    ) -> Result<Option<Attributes>, ThingError> {
        let selection = selection.clone().limit(1);
        let parts = SqlGenerator::select(table, &selection);
        Self::log("GET_ONE", table, &parts);

        let row = Self::query(&parts)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "get_one", e))?;

        row.map(|row| Self::record(table, &row)).transpose()
    }

    async fn get_all(
        &self,
        table: &ValidatedTableName,
        selection: &Selection,
    ) -> Result<Vec<Attributes>, ThingError> {
        let parts = SqlGenerator::select(table, selection);
        Self::log("GET_ALL", table, &parts);

        let rows = Self::query(&parts)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "get_all", e))?;

        rows.iter().map(|row| Self::record(table, row)).collect()
    }

    async fn count(&self, table: &ValidatedTableName, filter: &Where) -> Result<i64, ThingError> {
        let parts = SqlGenerator::count(table, filter);
        Self::log("COUNT", table, &parts);

        let row = Self::query(&parts)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "count", e))?;

        row.try_get("total")
            .map_err(|e| ThingError::database(table.as_str(), "count", e))
    }

    async fn insert(
        &self,
        table: &ValidatedTableName,
        assignments: &[Assignment],
    ) -> Result<Attributes, ThingError> {
        let parts = SqlGenerator::insert(table, assignments);
        Self::log("INSERT", table, &parts);

        let row = Self::query(&parts)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "insert", e))?;

        Self::record(table, &row)
    }

    async fn update(
        &self,
        table: &ValidatedTableName,
        assignments: &[Assignment],
        conditions: &[Condition],
    ) -> Result<u64, ThingError> {
        let parts = SqlGenerator::update(table, assignments, conditions);
        Self::log("UPDATE", table, &parts);

        let result = Self::query(&parts)
            .execute(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "update", e))?;

        Ok(result.rows_affected())
    }

    async fn delete(
        &self,
        table: &ValidatedTableName,
        conditions: &[Condition],
    ) -> Result<u64, ThingError> {
        let parts = SqlGenerator::delete(table, conditions);
        Self::log("DELETE", table, &parts);

        let result = Self::query(&parts)
            .execute(&self.pool)
            .await
            .map_err(|e| ThingError::database(table.as_str(), "delete", e))?;

        Ok(result.rows_affected())
    }
}
