//! Table field metadata
//!
//! Column descriptors discovered by introspecting the database, and the
//! primary key derived from them.

use serde::{Deserialize, Serialize};
use type_mapping::ColumnKind;

/// One row of column introspection as returned by a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawColumn {
    pub column_name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
    pub is_primary: bool,
}

impl RawColumn {
    /// Nullable, non-key column of the given SQL type
    pub fn new(column_name: &str, data_type: &str) -> Self {
        Self {
            column_name: column_name.to_string(),
            data_type: data_type.to_string(),
            udt_name: udt_name_for(data_type).to_string(),
            is_nullable: true,
            column_default: None,
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.is_nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.column_default = Some(default.to_string());
        self
    }
}

fn udt_name_for(data_type: &str) -> &'static str {
    match ColumnKind::from_data_type(data_type) {
        ColumnKind::SmallInt => "int2",
        ColumnKind::Integer => "int4",
        ColumnKind::BigInt => "int8",
        ColumnKind::Float => "float8",
        ColumnKind::Decimal => "numeric",
        ColumnKind::Boolean => "bool",
        ColumnKind::Text => "text",
        ColumnKind::Uuid => "uuid",
        ColumnKind::Timestamp => "timestamptz",
        ColumnKind::Date => "date",
        ColumnKind::Json => "jsonb",
        ColumnKind::Array => "_text",
        ColumnKind::Other => "text",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKey {
    Primary,
    None,
}

/// Descriptor of a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub data_type: String,
    pub udt_name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub default: Option<String>,
    pub key: ColumnKey,
}

impl FieldInfo {
    pub fn is_primary(&self) -> bool {
        self.key == ColumnKey::Primary
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Ordered column name → descriptor map for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    columns: Vec<(String, FieldInfo)>,
}

impl FieldMap {
    /// Key introspection rows by column name, keeping their order
    pub fn from_raw(rows: Vec<RawColumn>) -> Self {
        let columns = rows
            .into_iter()
            .map(|row| {
                let info = FieldInfo {
                    kind: ColumnKind::from_data_type(&row.data_type),
                    data_type: row.data_type,
                    udt_name: row.udt_name,
                    nullable: row.is_nullable,
                    default: row.column_default,
                    key: if row.is_primary {
                        ColumnKey::Primary
                    } else {
                        ColumnKey::None
                    },
                };
                (row.column_name, info)
            })
            .collect();

        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, info)| info)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldInfo)> {
        self.columns.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Primary key columns in ordinal order, if the table has any
    pub fn primary_key(&self) -> Option<PrimaryKey> {
        let mut key_columns: Vec<String> = self
            .iter()
            .filter(|(_, info)| info.is_primary())
            .map(|(name, _)| name.to_string())
            .collect();

        match key_columns.len() {
            0 => None,
            1 => key_columns.pop().map(PrimaryKey::Single),
            _ => Some(PrimaryKey::Composite(key_columns)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(column) => vec![column.as_str()],
            PrimaryKey::Composite(columns) => columns.iter().map(String::as_str).collect(),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, PrimaryKey::Composite(_))
    }
}
