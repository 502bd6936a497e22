//! Value comparison
//!
//! Loose equality decides whether an attribute changed since it was loaded.
//! Ordering and LIKE matching back the in-memory driver.

use crate::serialize::parse_timestamp;
use crate::types::PostgresValue;
use serde_json::Value;
use std::cmp::Ordering;

/// Equality that tolerates representation differences between a model's
/// serialized value and the value the database returned.
///
/// Numbers equal their string spelling, `5` equals `5.0`, and two strings
/// that are both timestamps compare as instants.
pub fn loosely_equal(current: &Value, original: &Value) -> bool {
    if current == original {
        return true;
    }

    match (current, original) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            if n.to_string() == *s {
                return true;
            }
            match (n.as_f64(), s.trim().parse::<f64>()) {
                (Some(a), Ok(b)) => a == b,
                _ => false,
            }
        }
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

/// Whether a soft-delete flag still reads as "not deleted"
pub fn is_unset_flag(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s == "0",
        Value::Bool(b) => !b,
        _ => false,
    }
}

impl PostgresValue {
    /// Ordering across compatible variants; `None` when incomparable
    pub fn compare(&self, other: &PostgresValue) -> Option<Ordering> {
        use PostgresValue::*;

        match (self, other) {
            (Null, _) | (_, Null) => None,
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Uuid(a), Text(b)) => Some(a.to_string().cmp(b)),
            (Text(a), Uuid(b)) => Some(a.cmp(&b.to_string())),
            (Timestamp(a), Text(b)) => parse_timestamp(b).map(|b| a.cmp(&b)),
            (Text(a), Timestamp(b)) => parse_timestamp(a).map(|a| a.cmp(b)),
            (Json(a), Json(b)) => (a == b).then_some(Ordering::Equal),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => match (a, b) {
                    (Text(s), n) | (n, Text(s)) => {
                        let parsed = s.trim().parse::<f64>().ok()?;
                        let number = n.as_f64()?;
                        if matches!(a, Text(_)) {
                            parsed.partial_cmp(&number)
                        } else {
                            number.partial_cmp(&parsed)
                        }
                    }
                    _ => None,
                },
            },
        }
    }

    /// SQL `LIKE` with `%` and `_` wildcards and `\` escapes
    pub fn like(&self, pattern: &str) -> bool {
        let text = match self {
            PostgresValue::Text(s) => s.clone(),
            PostgresValue::Null => return false,
            other => match other.to_json() {
                Value::String(s) => s,
                json => json.to_string(),
            },
        };
        let text: Vec<char> = text.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        like_match(&text, &pattern)
    }
}

fn like_match(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like_match(&text[skip..], rest)),
        Some(('_', rest)) => !text.is_empty() && like_match(&text[1..], rest),
        Some(('\\', rest)) if !rest.is_empty() => {
            text.first() == rest.first() && like_match(&text[1..], &rest[1..])
        }
        Some((c, rest)) => text.first() == Some(c) && like_match(&text[1..], rest),
    }
}
