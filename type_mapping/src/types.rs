//! Typed SQL values
//!
//! `PostgresValue` is what the drivers bind. Attribute maps stay JSON; values
//! are converted here on their way to a statement.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PostgresValue {
    Text(String),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Float(f64),
    Decimal(String), // Store as string to preserve precision
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Json(serde_json::Value),
    Array(Vec<PostgresValue>),
    Null,
}

impl PostgresValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PostgresValue::Null)
    }

    /// Integer view of any integral variant
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PostgresValue::SmallInt(v) => Some(*v as i64),
            PostgresValue::Integer(v) => Some(*v as i64),
            PostgresValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view of any numeric variant
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PostgresValue::Float(v) => Some(*v),
            PostgresValue::Decimal(s) => s.parse().ok(),
            other => other.as_i64().map(|v| v as f64),
        }
    }
}

impl From<String> for PostgresValue {
    fn from(val: String) -> Self {
        PostgresValue::Text(val)
    }
}

impl From<&str> for PostgresValue {
    fn from(val: &str) -> Self {
        PostgresValue::Text(val.to_string())
    }
}

impl From<i16> for PostgresValue {
    fn from(val: i16) -> Self {
        PostgresValue::SmallInt(val)
    }
}

impl From<i32> for PostgresValue {
    fn from(val: i32) -> Self {
        PostgresValue::Integer(val)
    }
}

impl From<i64> for PostgresValue {
    fn from(val: i64) -> Self {
        PostgresValue::BigInt(val)
    }
}

impl From<f64> for PostgresValue {
    fn from(val: f64) -> Self {
        PostgresValue::Float(val)
    }
}

impl From<bool> for PostgresValue {
    fn from(val: bool) -> Self {
        PostgresValue::Boolean(val)
    }
}

impl From<Uuid> for PostgresValue {
    fn from(val: Uuid) -> Self {
        PostgresValue::Uuid(val)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for PostgresValue {
    fn from(val: chrono::DateTime<chrono::Utc>) -> Self {
        PostgresValue::Timestamp(val)
    }
}

impl From<chrono::NaiveDate> for PostgresValue {
    fn from(val: chrono::NaiveDate) -> Self {
        PostgresValue::Date(val)
    }
}

impl From<serde_json::Value> for PostgresValue {
    fn from(val: serde_json::Value) -> Self {
        PostgresValue::from_json(&val)
    }
}

impl<T> From<Option<T>> for PostgresValue
where
    T: Into<PostgresValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => PostgresValue::Null,
        }
    }
}
