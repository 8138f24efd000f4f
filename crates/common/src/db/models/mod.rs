//! SeaORM entity models

mod planet;

pub use planet::{
    Entity as PlanetEntity,
    Model as Planet,
    ActiveModel as PlanetActiveModel,
    Column as PlanetColumn,
};
