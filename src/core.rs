//! Core thingbase functionality
//!
//! `ThingBase` owns the database driver and the cache settings, and hands
//! out a `ThingStore` per model.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use store_object::{Database, PgDatabase, Thing, ThingStore};

use crate::errors::ThingBaseError;
use config::{AppConfig, CacheConfig, DatabaseConfig};

/// Main thingbase coordinator holding the database connection
#[derive(Debug, Clone)]
pub struct ThingBase {
    database: Arc<dyn Database>,
    pool: Option<PgPool>,
    cache_config: CacheConfig,
}

impl ThingBase {
    /// Connect to PostgreSQL with default cache settings
    pub async fn new(config: DatabaseConfig) -> Result<Self, ThingBaseError> {
        Self::connect(&config, CacheConfig::default()).await
    }

    /// Connect using a full application configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, ThingBaseError> {
        Self::connect(&config.database, config.cache).await
    }

    /// Load the configuration file named in `.env` and connect
    pub async fn load() -> Result<Self, ThingBaseError> {
        let config = AppConfig::load()?;
        Self::from_config(config).await
    }

    async fn connect(
        config: &DatabaseConfig,
        cache_config: CacheConfig,
    ) -> Result<Self, ThingBaseError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        crate::debug_log!(
            "[CONNECT] Pool ready for {}:{}/{}",
            config.host,
            config.port,
            config.database
        );

        Ok(Self::from_pool(pool, cache_config))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, cache_config: CacheConfig) -> Self {
        Self {
            database: Arc::new(PgDatabase::new(pool.clone())),
            pool: Some(pool),
            cache_config,
        }
    }

    /// Use any driver, e.g. `MemoryDatabase` in tests
    pub fn with_database(database: Arc<dyn Database>, cache_config: CacheConfig) -> Self {
        Self {
            database,
            pool: None,
            cache_config,
        }
    }

    /// Store for one model type
    pub fn store<T: Thing>(&self) -> ThingStore<T> {
        ThingStore::new(self.database.clone(), self.cache_config.clone())
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    /// Get database pool reference; `None` for drivers without one
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), ThingBaseError> {
        self.database.ping().await?;
        Ok(())
    }
}
