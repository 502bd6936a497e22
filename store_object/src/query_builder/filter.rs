//! Attribute filter DSL
//!
//! A filter is a map of column → value. Plain values mean equality; string
//! values may carry an operator prefix (`!`, `>=`, `>`, `<=`, `<`) or a `%`
//! wildcard, `null` means `IS NULL` and an array means `IN`.

use crate::fields::FieldInfo;
use crate::validation::{ValidatedFieldName, ValidationError};
use serde_json::{Map, Value};
use type_mapping::{ColumnKind, PostgresValue};

/// Query condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,     // =
    Ne,     // !=
    Gt,     // >
    Gte,    // >=
    Lt,     // <
    Lte,    // <=
    Like,   // LIKE
    In,     // IN
    IsNull, // IS NULL
}

impl QueryOperator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "!=",
            QueryOperator::Gt => ">",
            QueryOperator::Gte => ">=",
            QueryOperator::Lt => "<",
            QueryOperator::Lte => "<=",
            QueryOperator::Like => "LIKE",
            QueryOperator::In => "IN",
            QueryOperator::IsNull => "IS NULL",
        }
    }
}

/// Single condition in a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: ValidatedFieldName,
    pub operator: QueryOperator,
    /// `None` for `IS NULL`; an `Array` for `IN`
    pub value: Option<PostgresValue>,
    /// Type name the placeholder is cast to
    pub cast: Option<String>,
    pub kind: Option<ColumnKind>,
}

impl Condition {
    pub fn new(
        column: &str,
        operator: QueryOperator,
        value: Option<PostgresValue>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            column: ValidatedFieldName::new(column)?,
            operator,
            value,
            cast: None,
            kind: None,
        })
    }

    /// Equal condition; a null value becomes `IS NULL`
    pub fn eq(column: &str, value: impl Into<PostgresValue>) -> Result<Self, ValidationError> {
        match value.into() {
            PostgresValue::Null => Self::is_null(column),
            value => Self::new(column, QueryOperator::Eq, Some(value)),
        }
    }

    pub fn is_null(column: &str) -> Result<Self, ValidationError> {
        Self::new(column, QueryOperator::IsNull, None)
    }

    /// Parse one filter entry
    pub fn from_filter(column: &str, value: &Value) -> Result<Self, ValidationError> {
        let (operator, value) = parse_filter_value(value);
        Self::new(column, operator, value)
    }

    /// Reshape the value for the column it is compared against
    ///
    /// `LIKE` patterns stay text; everything else is coerced to the column's
    /// kind and its placeholder cast to the column type.
    pub fn bind(mut self, field: &FieldInfo) -> Self {
        self.kind = Some(field.kind);

        if matches!(self.operator, QueryOperator::Like | QueryOperator::IsNull) {
            return self;
        }

        let operator = self.operator;
        self.value = self.value.map(|value| match (operator, value) {
            // IN compares item by item, even on json columns
            (QueryOperator::In, PostgresValue::Array(items)) => PostgresValue::Array(
                items.into_iter().map(|item| item.coerce(field.kind)).collect(),
            ),
            (_, value) => value.coerce(field.kind),
        });
        self.cast = Some(field.udt_name.clone());
        self
    }
}

fn parse_filter_value(value: &Value) -> (QueryOperator, Option<PostgresValue>) {
    match value {
        Value::Null => (QueryOperator::IsNull, None),
        Value::Array(items) => (
            QueryOperator::In,
            Some(PostgresValue::Array(
                items.iter().map(PostgresValue::from_json).collect(),
            )),
        ),
        Value::String(text) => {
            let (operator, operand) = parse_prefixed(text);
            (operator, Some(PostgresValue::Text(operand.to_string())))
        }
        other => (QueryOperator::Eq, Some(PostgresValue::from_json(other))),
    }
}

/// Split an operator prefix off a string filter value
///
/// Prefixes are checked in order, so `>=5` is `>= 5` rather than `> =5`.
fn parse_prefixed(text: &str) -> (QueryOperator, &str) {
    const PREFIXES: [(&str, QueryOperator); 5] = [
        ("!", QueryOperator::Ne),
        (">=", QueryOperator::Gte),
        (">", QueryOperator::Gt),
        ("<=", QueryOperator::Lte),
        ("<", QueryOperator::Lt),
    ];

    for (prefix, operator) in PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            return (operator, rest);
        }
    }

    if text.contains('%') {
        (QueryOperator::Like, text)
    } else {
        (QueryOperator::Eq, text)
    }
}

/// Translate a filter map into AND-combined conditions, in map order
pub fn build_query(filter: &Map<String, Value>) -> Result<Vec<Condition>, ValidationError> {
    filter
        .iter()
        .map(|(column, value)| Condition::from_filter(column, value))
        .collect()
}
