//! Error types for the thingbase crate

use config::ConfigError;
use store_object::ThingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThingBaseError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Thing(#[from] ThingError),
}
