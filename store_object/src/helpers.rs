//! Free-standing helpers shared by the store
//!
//! Cache key lines, primary key extraction and change detection.

use crate::entity::{Attributes, EntityState};
use crate::fields::{FieldMap, PrimaryKey, RawColumn};
use serde_json::Value;
use type_mapping::loosely_equal;

/// Flatten a value into a cache key fragment
///
/// Scalars render as text (`null` and `false` as the empty string, `true` as
/// `1`). Arrays and objects are JSON-encoded with non-ASCII escaped, every
/// non-word character is replaced by `separator`, runs of `_` collapse to one
/// and leading/trailing `_` and spaces are trimmed.
pub fn values_to_line(value: &Value, separator: &str) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            let encoded = ascii_json(value);

            let mut line = String::with_capacity(encoded.len());
            for c in encoded.chars() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    line.push(c);
                } else {
                    line.push_str(separator);
                }
            }

            let mut collapsed = String::with_capacity(line.len());
            for c in line.chars() {
                if c == '_' && collapsed.ends_with('_') {
                    continue;
                }
                collapsed.push(c);
            }

            collapsed.trim_matches(|c| c == '_' || c == ' ').to_string()
        }
    }
}

/// JSON text with every non-ASCII character as a `\uXXXX` escape
fn ascii_json(value: &Value) -> String {
    let encoded = value.to_string();
    let mut escaped = String::with_capacity(encoded.len());
    let mut units = [0u16; 2];

    for c in encoded.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }

    escaped
}

/// Key introspection rows by column name
pub fn fields_by_raw(rows: Vec<RawColumn>) -> FieldMap {
    FieldMap::from_raw(rows)
}

/// Separate the key condition from the values to write
///
/// The condition holds each key column that has a non-null value. For
/// persisted entities those columns are also taken out of the values, since
/// an update never rewrites its own key.
pub fn split_primary_key(
    primary_key: &PrimaryKey,
    mut values: Attributes,
    state: EntityState,
) -> (Attributes, Attributes) {
    let mut condition = Attributes::new();

    for column in primary_key.columns() {
        let present = values.get(column).is_some_and(|value| !value.is_null());
        if !present {
            continue;
        }

        let value = if state == EntityState::Persisted {
            values.remove(column)
        } else {
            values.get(column).cloned()
        };

        if let Some(value) = value {
            condition.insert(column.to_string(), value);
        }
    }

    (condition, values)
}

/// Drop values that still match the snapshot taken at load time
pub fn remove_unchanged_values(values: Attributes, original: &Attributes) -> Attributes {
    values
        .into_iter()
        .filter(|(key, value)| match original.get(key) {
            Some(loaded) => !loosely_equal(value, loaded),
            None => true,
        })
        .collect()
}
