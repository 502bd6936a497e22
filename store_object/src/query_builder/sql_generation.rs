//! PostgreSQL statement rendering
//!
//! Identifiers are always double-quoted and values always bound through
//! positional placeholders (`$1`, `$2`, ...). A placeholder is cast to the
//! column's type when the condition or assignment was bound to a column.

use crate::query_builder::builder::{Assignment, Selection, Where};
use crate::query_builder::filter::{Condition, QueryOperator};
use crate::query_builder::ordering::SortOrder;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use type_mapping::{ColumnKind, PostgresValue};

/// Alias rows are selected under, so `to_jsonb` can address the whole row
pub const ROW_ALIAS: &str = "__thing_row__";

/// Rendered SQL plus the values for its placeholders, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParts {
    pub sql: String,
    pub values: Vec<PostgresValue>,
}

impl QueryParts {
    /// AND-join conditions, numbering placeholders from `$1`
    pub fn render(conditions: &[Condition]) -> Self {
        let mut values = Vec::new();
        let sql = SqlGenerator::render_conditions(conditions, &mut values);
        Self { sql, values }
    }
}

pub struct SqlGenerator;

impl SqlGenerator {
    /// AND-join conditions, continuing the placeholder numbering of `values`
    pub fn render_conditions(conditions: &[Condition], values: &mut Vec<PostgresValue>) -> String {
        conditions
            .iter()
            .map(|condition| Self::render_condition(condition, values))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn render_condition(condition: &Condition, values: &mut Vec<PostgresValue>) -> String {
        let column = condition.column.quoted();
        let cast = condition.cast.as_deref();

        match (condition.operator, &condition.value) {
            (QueryOperator::IsNull, _) => format!("{} IS NULL", column),
            (QueryOperator::In, Some(PostgresValue::Array(items))) => {
                if items.is_empty() {
                    return "1=0".to_string(); // Empty IN clause
                }

                let placeholders: Vec<String> = items
                    .iter()
                    .map(|item| Self::push_value(values, item.clone(), cast))
                    .collect();

                format!("{} IN ({})", column, placeholders.join(", "))
            }
            (QueryOperator::Like, Some(value)) => {
                let subject = match condition.kind {
                    None | Some(ColumnKind::Text) => column,
                    Some(_) => format!("{}::text", column),
                };
                let param = Self::push_value(values, value.clone(), None);
                format!("{} LIKE {}", subject, param)
            }
            (QueryOperator::In, Some(value)) => {
                let param = Self::push_value(values, value.clone(), cast);
                format!("{} = {}", column, param)
            }
            (operator, Some(value)) => {
                let param = Self::push_value(values, value.clone(), cast);
                format!("{} {} {}", column, operator.to_sql(), param)
            }
            (_, None) => "1=0".to_string(),
        }
    }

    fn push_value(values: &mut Vec<PostgresValue>, value: PostgresValue, cast: Option<&str>) -> String {
        values.push(value);
        Self::placeholder(values.len(), cast)
    }

    fn placeholder(index: usize, cast: Option<&str>) -> String {
        match cast {
            Some(type_name) => format!("${}::\"{}\"", index, type_name),
            None => format!("${}", index),
        }
    }

    /// `WHERE ...` for a filter, or an empty string when it matches all rows
    pub fn build_where_clause(filter: &Where, values: &mut Vec<PostgresValue>) -> String {
        if filter.is_empty() {
            return String::new();
        }

        match filter {
            Where::Conditions(conditions) => {
                format!("WHERE {}", Self::render_conditions(conditions, values))
            }
            Where::Raw { sql, values: raw } => {
                values.extend(raw.iter().cloned());
                format!("WHERE {}", sql)
            }
        }
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(ValidatedFieldName, SortOrder)]) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", field.quoted(), order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<i64>, offset: Option<i64>) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }

    fn from_clause(table: &ValidatedTableName) -> String {
        format!("FROM {} AS \"{}\"", table.quoted(), ROW_ALIAS)
    }

    fn join_parts(parts: &[&str]) -> String {
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rows as a single JSONB `record` column
    pub fn select(table: &ValidatedTableName, selection: &Selection) -> QueryParts {
        let mut values = Vec::new();
        let head = format!("SELECT to_jsonb(\"{}\") AS record", ROW_ALIAS);
        let from = Self::from_clause(table);
        let where_clause = Self::build_where_clause(&selection.filter, &mut values);
        let order_clause = Self::build_order_clause(&selection.order_by);
        let limit_clause = Self::build_limit_clause(selection.limit, selection.offset);

        QueryParts {
            sql: Self::join_parts(&[&head, &from, &where_clause, &order_clause, &limit_clause]),
            values,
        }
    }

    /// Number of matching rows as a `total` column
    pub fn count(table: &ValidatedTableName, filter: &Where) -> QueryParts {
        let mut values = Vec::new();
        let from = Self::from_clause(table);
        let where_clause = Self::build_where_clause(filter, &mut values);

        QueryParts {
            sql: Self::join_parts(&["SELECT COUNT(*) AS total", &from, &where_clause]),
            values,
        }
    }

    /// INSERT returning the stored row as `record`
    pub fn insert(table: &ValidatedTableName, assignments: &[Assignment]) -> QueryParts {
        let mut values = Vec::new();
        let target = format!("INSERT INTO {} AS \"{}\"", table.quoted(), ROW_ALIAS);
        let returning = format!("RETURNING to_jsonb(\"{}\") AS record", ROW_ALIAS);

        let body = if assignments.is_empty() {
            "DEFAULT VALUES".to_string()
        } else {
            let columns: Vec<String> = assignments.iter().map(|a| a.column.quoted()).collect();
            let placeholders: Vec<String> = assignments
                .iter()
                .map(|a| Self::push_value(&mut values, a.value.clone(), a.cast.as_deref()))
                .collect();
            format!("({}) VALUES ({})", columns.join(", "), placeholders.join(", "))
        };

        QueryParts {
            sql: Self::join_parts(&[&target, &body, &returning]),
            values,
        }
    }

    /// UPDATE of the assigned columns on rows matching every condition
    pub fn update(
        table: &ValidatedTableName,
        assignments: &[Assignment],
        conditions: &[Condition],
    ) -> QueryParts {
        let mut values = Vec::new();
        let set_items: Vec<String> = assignments
            .iter()
            .map(|a| {
                let param = Self::push_value(&mut values, a.value.clone(), a.cast.as_deref());
                format!("{} = {}", a.column.quoted(), param)
            })
            .collect();

        let head = format!("UPDATE {} SET {}", table.quoted(), set_items.join(", "));
        let where_clause =
            Self::build_where_clause(&Where::Conditions(conditions.to_vec()), &mut values);

        QueryParts {
            sql: Self::join_parts(&[&head, &where_clause]),
            values,
        }
    }

    /// DELETE of rows matching every condition
    pub fn delete(table: &ValidatedTableName, conditions: &[Condition]) -> QueryParts {
        let mut values = Vec::new();
        let head = format!("DELETE FROM {}", table.quoted());
        let where_clause =
            Self::build_where_clause(&Where::Conditions(conditions.to_vec()), &mut values);

        QueryParts {
            sql: Self::join_parts(&[&head, &where_clause]),
            values,
        }
    }
}
