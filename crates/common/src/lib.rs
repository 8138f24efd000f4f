//! Planetdex Common Library
//!
//! Shared code for the Planetdex service including:
//! - Planet domain model, validation and update rules
//! - Persistence (SeaORM repository and in-memory store)
//! - Appearance enrichment client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics helpers

pub mod config;
pub mod db;
pub mod enrichment;
pub mod errors;
pub mod metrics;
pub mod planets;
pub mod service;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{MemoryStore, PlanetStore, Repository};
pub use enrichment::AppearanceLookup;
pub use errors::{AppError, Result};
pub use service::PlanetService;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default upstream used to resolve planet appearances
pub const DEFAULT_ENRICHMENT_BASE_URL: &str = "https://swapi.dev/api";
