//! SQL type classification
//!
//! This module maps the `data_type` reported by `information_schema.columns`
//! onto the small set of value kinds the drivers know how to bind.

use serde::{Deserialize, Serialize};

/// Storage class of a column, as far as binding is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    SmallInt,
    Integer,
    BigInt,
    Float,
    Decimal,
    Boolean,
    Text,
    Uuid,
    Timestamp,
    Date,
    Json,
    Array,
    Other,
}

impl ColumnKind {
    /// Classify an `information_schema.columns.data_type` value
    pub fn from_data_type(data_type: &str) -> Self {
        let normalized = data_type.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "smallint" | "int2" | "smallserial" => ColumnKind::SmallInt,
            "integer" | "int" | "int4" | "serial" => ColumnKind::Integer,
            "bigint" | "int8" | "bigserial" => ColumnKind::BigInt,
            "real" | "float4" | "double precision" | "float8" => ColumnKind::Float,
            "numeric" | "decimal" | "money" => ColumnKind::Decimal,
            "boolean" | "bool" => ColumnKind::Boolean,
            "text" | "character varying" | "varchar" | "character" | "char" | "bpchar"
            | "citext" | "name" => ColumnKind::Text,
            "uuid" => ColumnKind::Uuid,
            "timestamp with time zone"
            | "timestamp without time zone"
            | "timestamptz"
            | "timestamp" => ColumnKind::Timestamp,
            "date" => ColumnKind::Date,
            "json" | "jsonb" => ColumnKind::Json,
            "array" => ColumnKind::Array,
            _ => ColumnKind::Other,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnKind::SmallInt | ColumnKind::Integer | ColumnKind::BigInt
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, ColumnKind::Float | ColumnKind::Decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_information_schema_names() {
        assert_eq!(ColumnKind::from_data_type("integer"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_data_type("bigint"), ColumnKind::BigInt);
        assert_eq!(
            ColumnKind::from_data_type("character varying"),
            ColumnKind::Text
        );
        assert_eq!(
            ColumnKind::from_data_type("timestamp with time zone"),
            ColumnKind::Timestamp
        );
        assert_eq!(ColumnKind::from_data_type("jsonb"), ColumnKind::Json);
        assert_eq!(ColumnKind::from_data_type("ARRAY"), ColumnKind::Array);
        assert_eq!(ColumnKind::from_data_type("USER-DEFINED"), ColumnKind::Other);
    }

    #[test]
    fn test_numeric_groups() {
        assert!(ColumnKind::SmallInt.is_integer());
        assert!(ColumnKind::Decimal.is_numeric());
        assert!(!ColumnKind::Decimal.is_integer());
        assert!(!ColumnKind::Text.is_numeric());
    }
}
