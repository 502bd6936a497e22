use crate::validation::{FieldErrors, ValidationError};
use cache_system::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThingError {
    #[error("No table `{0}` in database")]
    TableNotFound(String),

    #[error("Invalid table specified in {model}: {source}")]
    InvalidTable {
        model: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("Invalid field name: {0}")]
    InvalidField(#[from] ValidationError),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Primary key value missing for a row of `{0}`")]
    MissingPrimaryKey(String),

    #[error("Model {0} does not serialize to a map of attributes")]
    NotAnObject(&'static str),

    #[error("Database error on `{table}` during {operation}: {source}")]
    Database {
        table: String,
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Statement rejected on `{table}`: {message}")]
    Rejected { table: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ThingError {
    pub fn database(table: &str, operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database {
            table: table.to_string(),
            operation,
            source,
        }
    }

    pub fn rejected(table: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            table: table.to_string(),
            message: message.into(),
        }
    }

    /// Field errors when this is a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
