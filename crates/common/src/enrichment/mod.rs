//! Appearance enrichment
//!
//! Resolves how many films a planet appears in. Provides:
//! - SWAPI search client (production)
//! - Static table lookup (offline runs and tests)

use crate::config::EnrichmentConfig;
use crate::errors::{AppError, Result};
use crate::planets::fold_name;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Trait for appearance lookups
#[async_trait]
pub trait AppearanceLookup: Send + Sync {
    /// Number of films the best match for `name` appears in, 0 when nothing matches
    async fn appearances(&self, name: &str) -> Result<u32>;

    /// Provider label used in logs and metrics
    fn provider(&self) -> &str;
}

/// Client for the SWAPI planet search endpoint
pub struct SwapiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<PlanetRecord>,
}

#[derive(Deserialize)]
struct PlanetRecord {
    #[serde(default)]
    films: Value,
}

/// Distinct film references on a search hit
fn count_films(films: &Value) -> u32 {
    let count = match films {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(url) => url.clone(),
                other => other.to_string(),
            })
            .collect::<BTreeSet<_>>()
            .len(),
        Value::Object(map) => map.len(),
        _ => 0,
    };
    u32::try_from(count).unwrap_or(u32::MAX)
}

impl SwapiClient {
    /// Create a new client against `base_url` (e.g. `https://swapi.dev/api`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/planets/", self.base_url)
    }
}

#[async_trait]
impl AppearanceLookup for SwapiClient {
    async fn appearances(&self, name: &str) -> Result<u32> {
        let response = self
            .client
            .get(self.search_url())
            .query(&[("search", name)])
            .send()
            .await
            .map_err(|e| AppError::Enrichment {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Enrichment {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: SearchResponse = response.json().await.map_err(|e| AppError::Enrichment {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(result
            .results
            .first()
            .map(|hit| count_films(&hit.films))
            .unwrap_or(0))
    }

    fn provider(&self) -> &str {
        "swapi"
    }
}

/// Film counts as published by SWAPI, for running without the upstream
const CANONICAL_APPEARANCES: &[(&str, u32)] = &[
    ("Tatooine", 5),
    ("Alderaan", 2),
    ("Yavin IV", 1),
    ("Hoth", 1),
    ("Dagobah", 3),
    ("Bespin", 1),
    ("Endor", 1),
    ("Naboo", 4),
    ("Coruscant", 4),
    ("Kamino", 1),
    ("Geonosis", 1),
    ("Utapau", 1),
    ("Mustafar", 1),
    ("Kashyyyk", 2),
    ("Polis Massa", 1),
    ("Mygeeto", 1),
    ("Felucia", 1),
    ("Cato Neimoidia", 1),
    ("Saleucami", 1),
];

/// Table-driven lookup keyed by folded name
#[derive(Default)]
pub struct StaticLookup {
    table: HashMap<String, u32>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup preloaded with the canonical film counts
    pub fn canonical() -> Self {
        CANONICAL_APPEARANCES
            .iter()
            .fold(Self::new(), |lookup, (name, count)| lookup.with(name, *count))
    }

    /// Lookup that fails every call, standing in for an upstream outage
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, name: &str, count: u32) -> Self {
        self.table.insert(fold_name(name), count);
        self
    }

    /// Number of lookups served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppearanceLookup for StaticLookup {
    async fn appearances(&self, name: &str) -> Result<u32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(AppError::Enrichment {
                message: "static lookup marked unavailable".to_string(),
            });
        }
        Ok(self.table.get(&fold_name(name)).copied().unwrap_or(0))
    }

    fn provider(&self) -> &str {
        "static"
    }
}

/// Create a lookup based on configuration
pub fn create_lookup(config: &EnrichmentConfig) -> Result<Arc<dyn AppearanceLookup>> {
    match config.provider.as_str() {
        "swapi" => Ok(Arc::new(SwapiClient::new(
            config.base_url.clone(),
            config.timeout(),
        )?)),
        "static" => Ok(Arc::new(StaticLookup::canonical())),
        other => Err(AppError::Configuration {
            message: format!("unknown enrichment provider `{}`", other),
        }),
    }
}
