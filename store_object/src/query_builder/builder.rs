//! Statement inputs handed to a `Database`
//!
//! Drivers receive structured selections rather than SQL so that the
//! in-memory driver can evaluate them directly.

use crate::fields::FieldInfo;
use crate::query_builder::filter::Condition;
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::pagination::ListOptions;
use crate::validation::{ValidatedFieldName, ValidationError};
use type_mapping::PostgresValue;

/// WHERE part of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// AND-combined conditions
    Conditions(Vec<Condition>),
    /// Caller supplied SQL fragment with `$1`, `$2`, ... placeholders
    Raw {
        sql: String,
        values: Vec<PostgresValue>,
    },
}

impl Where {
    pub fn all() -> Self {
        Where::Conditions(Vec::new())
    }

    pub fn raw(sql: &str, values: Vec<PostgresValue>) -> Self {
        Where::Raw {
            sql: sql.trim().to_string(),
            values,
        }
    }

    /// Whether the clause matches every row
    pub fn is_empty(&self) -> bool {
        match self {
            Where::Conditions(conditions) => conditions.is_empty(),
            Where::Raw { sql, .. } => sql.is_empty(),
        }
    }
}

impl Default for Where {
    fn default() -> Self {
        Self::all()
    }
}

/// Row selection for `get_one` / `get_all`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub filter: Where,
    pub order_by: Vec<(ValidatedFieldName, SortOrder)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Selection {
    pub fn new(filter: Where) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Apply listing options, validating the order columns
    pub fn with_options(mut self, options: &ListOptions) -> Result<Self, ValidationError> {
        for (column, order) in &options.order_by {
            self.order_by.push((ValidatedFieldName::new(column)?, *order));
        }
        self.limit = options.limit;
        self.offset = options.offset;
        Ok(self)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `column = value` in an INSERT or UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ValidatedFieldName,
    pub value: PostgresValue,
    pub cast: Option<String>,
}

impl Assignment {
    pub fn new(column: &str, value: impl Into<PostgresValue>) -> Result<Self, ValidationError> {
        Ok(Self {
            column: ValidatedFieldName::new(column)?,
            value: value.into(),
            cast: None,
        })
    }

    /// Coerce the value to the column's kind and cast its placeholder
    pub fn bind(mut self, field: &FieldInfo) -> Self {
        self.value = self.value.coerce(field.kind);
        self.cast = Some(field.udt_name.clone());
        self
    }
}
