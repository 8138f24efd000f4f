//! Database layer for Planetdex
//!
//! Provides:
//! - SeaORM entity models
//! - The `PlanetStore` seam used by the service layer
//! - Repository over SeaORM and an in-memory store
//! - Connection pool management

mod memory;
pub mod models;
mod repository;

pub use memory::MemoryStore;
pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::planets::Planet;
use async_trait::async_trait;
use models::PlanetEntity;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Persistence operations for planets.
///
/// Implementations enforce folded-name uniqueness atomically per write and
/// report violations as `AppError::Validation`.
#[async_trait]
pub trait PlanetStore: Send + Sync {
    /// Persist a new planet
    async fn insert(&self, planet: Planet) -> Result<Planet>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Planet>>;

    /// Exact match on the folded name
    async fn find_by_name(&self, name: &str) -> Result<Option<Planet>>;

    /// Folded substring match, in natural order
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Planet>>;

    /// Natural order window; `limit = None` returns everything after `skip`
    async fn list(&self, skip: u64, limit: Option<u64>) -> Result<Vec<Planet>>;

    /// Replace the stored record with the same id. `None` if it no longer exists.
    async fn update(&self, planet: Planet) -> Result<Option<Planet>>;

    /// Remove and return the record
    async fn delete(&self, id: Uuid) -> Result<Option<Planet>>;

    /// Check connectivity
    async fn ping(&self) -> Result<()>;
}

/// Database connection pool wrapper
#[cfg_attr(not(test), derive(Clone))]
pub struct DbPool {
    pub primary: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let primary = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { primary })
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Create the planets table (with its unique folded-name column) if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.primary.get_database_backend();
        let schema = Schema::new(backend);
        let statement = schema
            .create_table_from_entity(PlanetEntity)
            .if_not_exists()
            .to_owned();

        self.primary.execute(backend.build(&statement)).await?;
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }
}

/// Open the store named by `config.url`
pub async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn PlanetStore>> {
    if config.uses_memory_store() {
        info!("Using in-memory planet store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = DbPool::new(config).await?;
    pool.ensure_schema().await?;
    Ok(Arc::new(Repository::new(pool)))
}
