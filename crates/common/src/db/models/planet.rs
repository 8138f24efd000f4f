//! Planet entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "planets")]
pub struct Model {
    /// UUID v7, so ordering by id follows insertion order
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Case/accent folded name carrying the uniqueness constraint
    #[sea_orm(column_type = "Text", unique)]
    #[serde(skip)]
    pub name_key: String,

    #[sea_orm(column_type = "Text")]
    pub climate: String,

    #[sea_orm(column_type = "Text")]
    pub terrain: String,

    pub appearances: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
