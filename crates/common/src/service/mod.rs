//! Planet application service
//!
//! Orchestrates one write: validate the draft, check the name is free,
//! resolve appearances when the name is new, then persist. Enrichment lives
//! here rather than in the entity so the entity stays a plain record.

use crate::db::PlanetStore;
use crate::enrichment::AppearanceLookup;
use crate::errors::{AppError, FieldError, Result, ValidationFailure};
use crate::metrics;
use crate::planets::{parse_planet_id, Pagination, Planet, PlanetDraft, PlanetPatch};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of enrichment for a write, reported next to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// The lookup failed; `appearances` is 0 (create) or the previous value (rename)
    Unavailable,
}

/// Entity returned from a write
#[derive(Debug, Clone, Serialize)]
pub struct PlanetResponse {
    #[serde(flatten)]
    pub planet: Planet,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentStatus>,
}

impl PlanetResponse {
    fn new(planet: Planet, appearances: Option<i32>) -> Self {
        Self {
            planet,
            enrichment: appearances.is_none().then_some(EnrichmentStatus::Unavailable),
        }
    }
}

#[derive(Clone)]
pub struct PlanetService {
    store: Arc<dyn PlanetStore>,
    lookup: Arc<dyn AppearanceLookup>,
}

impl PlanetService {
    pub fn new(store: Arc<dyn PlanetStore>, lookup: Arc<dyn AppearanceLookup>) -> Self {
        Self { store, lookup }
    }

    /// Resolve appearances for `name`. `None` when the upstream is unavailable.
    async fn resolve_appearances(&self, name: &str) -> Option<i32> {
        let start = Instant::now();
        let result = self.lookup.appearances(name).await;
        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_enrichment(elapsed, self.lookup.provider(), result.is_ok());

        match result {
            Ok(count) => Some(i32::try_from(count).unwrap_or(i32::MAX)),
            Err(e) => {
                warn!(
                    name = %name,
                    provider = self.lookup.provider(),
                    error = %e,
                    "Appearance lookup failed, continuing without it"
                );
                None
            }
        }
    }

    /// Field checks plus the uniqueness pre-check. The store constraint still
    /// decides races between concurrent writers.
    async fn check_draft(&self, draft: &PlanetDraft, owner: Option<Uuid>) -> Result<()> {
        let mut failure: ValidationFailure = draft.check();

        if !draft.name.is_empty() {
            if let Some(existing) = self.store.find_by_name(&draft.name).await? {
                if Some(existing.id) != owner {
                    failure.push(FieldError::unique("name", &draft.name));
                }
            }
        }

        failure.into_result()
    }

    async fn load(&self, raw_id: &str) -> Result<Planet> {
        let id = parse_planet_id(raw_id).ok_or_else(|| AppError::planet_not_found(raw_id))?;
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::planet_not_found(raw_id))
    }

    /// Create a planet from a JSON body
    pub async fn create(&self, body: &Map<String, Value>) -> Result<PlanetResponse> {
        let draft = PlanetDraft::from_body(body);
        self.check_draft(&draft, None).await?;

        let appearances = self.resolve_appearances(&draft.name).await;
        let planet = self
            .store
            .insert(Planet {
                id: Uuid::now_v7(),
                name_key: draft.name_key(),
                name: draft.name,
                climate: draft.climate,
                terrain: draft.terrain,
                appearances: appearances.unwrap_or(0),
            })
            .await?;

        metrics::record_write("create");
        info!(
            planet_id = %planet.id,
            name = %planet.name,
            appearances = planet.appearances,
            "Planet created"
        );

        Ok(PlanetResponse::new(planet, appearances))
    }

    /// Fetch by id; malformed ids are reported as not found
    pub async fn get(&self, raw_id: &str) -> Result<Planet> {
        self.load(raw_id).await
    }

    /// Fetch by case-insensitive name
    pub async fn find_by_name(&self, name: &str) -> Result<Planet> {
        self.store
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::planet_not_found(name))
    }

    pub async fn list(&self, page: Pagination) -> Result<Vec<Planet>> {
        self.store.list(page.skip, page.limit).await
    }

    /// Case-insensitive substring search; no hits is a not-found
    pub async fn search_by_name(&self, fragment: &str) -> Result<Vec<Planet>> {
        let planets = self.store.search_by_name(fragment).await?;
        if planets.is_empty() {
            return Err(AppError::planet_not_found(fragment));
        }
        Ok(planets)
    }

    /// Apply a whitelisted partial update
    pub async fn update(&self, raw_id: &str, body: &Map<String, Value>) -> Result<PlanetResponse> {
        let patch = PlanetPatch::from_body(body)?;
        let current = self.load(raw_id).await?;

        let draft = patch.apply(&current);
        self.check_draft(&draft, Some(current.id)).await?;

        let (appearances, resolved) = if draft.renames(&current) {
            let resolved = self.resolve_appearances(&draft.name).await;
            (resolved.unwrap_or(current.appearances), resolved)
        } else {
            (current.appearances, Some(current.appearances))
        };

        let planet = self
            .store
            .update(Planet {
                id: current.id,
                name_key: draft.name_key(),
                name: draft.name,
                climate: draft.climate,
                terrain: draft.terrain,
                appearances,
            })
            .await?
            .ok_or_else(|| AppError::planet_not_found(raw_id))?;

        metrics::record_write("update");
        info!(
            planet_id = %planet.id,
            name = %planet.name,
            appearances = planet.appearances,
            "Planet updated"
        );

        Ok(PlanetResponse::new(planet, resolved))
    }

    /// Hard delete, returning the removed record
    pub async fn delete(&self, raw_id: &str) -> Result<Planet> {
        let id = parse_planet_id(raw_id).ok_or_else(|| AppError::planet_not_found(raw_id))?;
        let planet = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| AppError::planet_not_found(raw_id))?;

        metrics::record_write("delete");
        info!(planet_id = %planet.id, name = %planet.name, "Planet deleted");

        Ok(planet)
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}
