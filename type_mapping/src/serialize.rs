//! Conversion between JSON attribute values and `PostgresValue`
//!
//! Attributes arrive as loosely-typed JSON (a filter such as `">5"` is a
//! string even when the column is an integer); `coerce` reshapes them to the
//! column's kind before they are bound.

use crate::sql::ColumnKind;
use crate::types::PostgresValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};

impl PostgresValue {
    /// Untyped conversion, used when the column kind is not known
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => PostgresValue::Null,
            Value::Bool(b) => PostgresValue::Boolean(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PostgresValue::BigInt(i)
                } else if let Some(f) = n.as_f64() {
                    if n.is_u64() {
                        PostgresValue::Decimal(n.to_string())
                    } else {
                        PostgresValue::Float(f)
                    }
                } else {
                    PostgresValue::Decimal(n.to_string())
                }
            }
            Value::String(s) => PostgresValue::Text(s.clone()),
            Value::Array(items) => {
                PostgresValue::Array(items.iter().map(PostgresValue::from_json).collect())
            }
            Value::Object(_) => PostgresValue::Json(value.clone()),
        }
    }

    /// JSON form, matching what `to_jsonb` produces for the same column
    pub fn to_json(&self) -> Value {
        match self {
            PostgresValue::Text(s) => Value::String(s.clone()),
            PostgresValue::SmallInt(v) => Value::from(*v),
            PostgresValue::Integer(v) => Value::from(*v),
            PostgresValue::BigInt(v) => Value::from(*v),
            PostgresValue::Float(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
            PostgresValue::Decimal(s) => serde_json::from_str::<Number>(s)
                .map(Value::Number)
                .unwrap_or_else(|_| Value::String(s.clone())),
            PostgresValue::Boolean(b) => Value::Bool(*b),
            PostgresValue::Uuid(u) => Value::String(u.to_string()),
            PostgresValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            PostgresValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            PostgresValue::Json(v) => v.clone(),
            PostgresValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            PostgresValue::Null => Value::Null,
        }
    }

    /// Convert to the representation expected by a column of `kind`
    ///
    /// Values that cannot be converted are returned unchanged and left for
    /// the database to reject.
    pub fn coerce(self, kind: ColumnKind) -> Self {
        match (self, kind) {
            (PostgresValue::Null, _) => PostgresValue::Null,
            // a whole array is one json document
            (value, ColumnKind::Json) => match value {
                PostgresValue::Json(v) => PostgresValue::Json(v),
                other => PostgresValue::Json(other.to_json()),
            },
            (PostgresValue::Array(items), _) => {
                PostgresValue::Array(items.into_iter().map(|v| v.coerce(kind)).collect())
            }
            (value, ColumnKind::SmallInt | ColumnKind::Integer | ColumnKind::BigInt) => {
                match integer_of(&value) {
                    Some(i) => narrow_integer(i, kind),
                    None => value,
                }
            }
            (value, ColumnKind::Float) => match float_of(&value) {
                Some(f) => PostgresValue::Float(f),
                None => value,
            },
            (value, ColumnKind::Decimal) => match &value {
                PostgresValue::Text(s) if s.trim().parse::<f64>().is_ok() => {
                    PostgresValue::Decimal(s.trim().to_string())
                }
                PostgresValue::Boolean(_) | PostgresValue::Text(_) => value,
                other => match other.as_f64() {
                    Some(_) => PostgresValue::Decimal(number_text(other)),
                    None => value,
                },
            },
            (value, ColumnKind::Boolean) => match &value {
                PostgresValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "t" | "true" | "y" | "yes" | "on" => PostgresValue::Boolean(true),
                    "0" | "f" | "false" | "n" | "no" | "off" | "" => PostgresValue::Boolean(false),
                    _ => value,
                },
                other => match other.as_f64() {
                    Some(f) => PostgresValue::Boolean(f != 0.0),
                    None => value,
                },
            },
            (PostgresValue::Text(s), ColumnKind::Uuid) => match uuid::Uuid::parse_str(s.trim()) {
                Ok(u) => PostgresValue::Uuid(u),
                Err(_) => PostgresValue::Text(s),
            },
            (PostgresValue::Text(s), ColumnKind::Timestamp) => match parse_timestamp(&s) {
                Some(ts) => PostgresValue::Timestamp(ts),
                None => PostgresValue::Text(s),
            },
            (PostgresValue::Timestamp(ts), ColumnKind::Date) => PostgresValue::Date(ts.date_naive()),
            (PostgresValue::Text(s), ColumnKind::Date) => match parse_date(&s) {
                Some(d) => PostgresValue::Date(d),
                None => PostgresValue::Text(s),
            },
            (value, ColumnKind::Text) => match value {
                PostgresValue::Text(s) => PostgresValue::Text(s),
                PostgresValue::Json(v) => PostgresValue::Text(v.to_string()),
                other => match other.to_json() {
                    Value::String(s) => PostgresValue::Text(s),
                    json => PostgresValue::Text(json.to_string()),
                },
            },
            (value, _) => value,
        }
    }
}

fn integer_of(value: &PostgresValue) -> Option<i64> {
    match value {
        PostgresValue::Text(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(whole_number)
            })
        }
        PostgresValue::Boolean(b) => Some(*b as i64),
        PostgresValue::Float(f) => whole_number(*f),
        PostgresValue::Decimal(s) => s.parse::<i64>().ok(),
        other => other.as_i64(),
    }
}

/// Integral floats inside the `i64` range; `as` would saturate the rest
fn whole_number(f: f64) -> Option<i64> {
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&f);
    (in_range && f.fract() == 0.0).then_some(f as i64)
}

fn float_of(value: &PostgresValue) -> Option<f64> {
    match value {
        PostgresValue::Text(s) => s.trim().parse::<f64>().ok(),
        PostgresValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

fn narrow_integer(i: i64, kind: ColumnKind) -> PostgresValue {
    match kind {
        ColumnKind::SmallInt => i16::try_from(i)
            .map(PostgresValue::SmallInt)
            .unwrap_or(PostgresValue::BigInt(i)),
        ColumnKind::Integer => i32::try_from(i)
            .map(PostgresValue::Integer)
            .unwrap_or(PostgresValue::BigInt(i)),
        _ => PostgresValue::BigInt(i),
    }
}

fn number_text(value: &PostgresValue) -> String {
    match value.to_json() {
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Parse the timestamp spellings PostgreSQL and chrono produce
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date(s)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
