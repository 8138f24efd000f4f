//! Repository pattern for database operations
//!
//! SeaORM-backed `PlanetStore`. Uniqueness of the folded name is enforced by
//! the table's UNIQUE constraint; violations come back as validation errors.

use crate::db::models::*;
use crate::db::{DbPool, PlanetStore};
use crate::errors::{AppError, Result, ValidationFailure};
use crate::planets::{fold_fragment, fold_name, MAX_PAGE_COUNT};
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

/// Repository for data access operations
#[cfg_attr(not(test), derive(Clone))]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }
}

/// Map constraint violations on write to the validation error clients expect
fn write_error(err: DbErr, name: &str) -> AppError {
    constraint_error(err.sql_err(), name).unwrap_or(AppError::Database(err))
}

fn constraint_error(sql_err: Option<SqlErr>, name: &str) -> Option<AppError> {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            Some(AppError::Validation(ValidationFailure::duplicate_name(name)))
        }
        _ => None,
    }
}

/// LIKE pattern matching `fragment` literally anywhere in the value
fn contains_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl PlanetStore for Repository {
    async fn insert(&self, planet: Planet) -> Result<Planet> {
        let name = planet.name.clone();
        let active = PlanetActiveModel {
            id: Set(planet.id),
            name: Set(planet.name),
            name_key: Set(planet.name_key),
            climate: Set(planet.climate),
            terrain: Set(planet.terrain),
            appearances: Set(planet.appearances),
        };

        active
            .insert(self.conn())
            .await
            .map_err(|e| write_error(e, &name))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Planet>> {
        PlanetEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Planet>> {
        PlanetEntity::find()
            .filter(PlanetColumn::NameKey.eq(fold_name(name)))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Planet>> {
        let pattern = LikeExpr::new(contains_pattern(&fold_fragment(fragment))).escape('\\');

        PlanetEntity::find()
            .filter(Expr::col(PlanetColumn::NameKey).like(pattern))
            .order_by_asc(PlanetColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list(&self, skip: u64, limit: Option<u64>) -> Result<Vec<Planet>> {
        PlanetEntity::find()
            .order_by_asc(PlanetColumn::Id)
            .offset(skip.min(MAX_PAGE_COUNT))
            .limit(limit.map(|l| l.min(MAX_PAGE_COUNT)))
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn update(&self, planet: Planet) -> Result<Option<Planet>> {
        let name = planet.name.clone();
        let active = PlanetActiveModel {
            id: Unchanged(planet.id),
            name: Set(planet.name),
            name_key: Set(planet.name_key),
            climate: Set(planet.climate),
            terrain: Set(planet.terrain),
            appearances: Set(planet.appearances),
        };

        match active.update(self.conn()).await {
            Ok(updated) => Ok(Some(updated)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(write_error(e, &name)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Planet>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let result = PlanetEntity::delete_by_id(id).exec(self.conn()).await?;

        // A concurrent delete may have won between the read and the write
        Ok((result.rows_affected > 0).then_some(existing))
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
