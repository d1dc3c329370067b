//! Recipe costing actor.

mod commands;
mod recipe;

pub use commands::{RecipeCommand, RecipeResponse};
pub use recipe::{
    CostBreakdown, CostSnapshot, CostingError, LineCost, Recipe, RecipeIngredient, UnitOfMeasure,
};
