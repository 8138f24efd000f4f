//! In-memory planet store
//!
//! Keeps planets in insertion order behind a single `RwLock`. The uniqueness
//! check and the write happen under the same write guard, so two racing
//! writes with the same folded name resolve exactly like the SQL constraint.

use crate::db::PlanetStore;
use crate::errors::{AppError, Result, ValidationFailure};
use crate::planets::{fold_fragment, fold_name, Pagination, Planet};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    planets: RwLock<Vec<Planet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.planets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.planets.read().await.is_empty()
    }
}

fn name_taken(planets: &[Planet], name_key: &str, except: Option<Uuid>) -> bool {
    planets
        .iter()
        .any(|p| p.name_key == name_key && Some(p.id) != except)
}

#[async_trait]
impl PlanetStore for MemoryStore {
    async fn insert(&self, planet: Planet) -> Result<Planet> {
        let mut planets = self.planets.write().await;
        if name_taken(&planets, &planet.name_key, None) {
            return Err(AppError::Validation(ValidationFailure::duplicate_name(&planet.name)));
        }
        planets.push(planet.clone());
        Ok(planet)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Planet>> {
        let planets = self.planets.read().await;
        Ok(planets.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Planet>> {
        let key = fold_name(name);
        let planets = self.planets.read().await;
        Ok(planets.iter().find(|p| p.name_key == key).cloned())
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Planet>> {
        let key = fold_fragment(fragment);
        let planets = self.planets.read().await;
        Ok(planets
            .iter()
            .filter(|p| p.name_key.contains(&key))
            .cloned()
            .collect())
    }

    async fn list(&self, skip: u64, limit: Option<u64>) -> Result<Vec<Planet>> {
        let planets = self.planets.read().await;
        Ok(Pagination { skip, limit }.slice(&planets))
    }

    async fn update(&self, planet: Planet) -> Result<Option<Planet>> {
        let mut planets = self.planets.write().await;
        if name_taken(&planets, &planet.name_key, Some(planet.id)) {
            return Err(AppError::Validation(ValidationFailure::duplicate_name(&planet.name)));
        }
        match planets.iter_mut().find(|p| p.id == planet.id) {
            Some(slot) => {
                *slot = planet.clone();
                Ok(Some(planet))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Planet>> {
        let mut planets = self.planets.write().await;
        let index = planets.iter().position(|p| p.id == id);
        Ok(index.map(|index| planets.remove(index)))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
