//! Recipe state and the portion-cost arithmetic.

use chrono::{DateTime, Utc};
use common::EntityId;
use rust_decimal::{Decimal, RoundingStrategy};
use runtime::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Line-level costs round to 4 decimal places, the portion total to 2.
pub(crate) fn round_line(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn round_portion(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Units an ingredient can be measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    Gram,
    Kilogram,
    Milliliter,
    Liter,
    Each,
}

impl std::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnitOfMeasure::Gram => "g",
            UnitOfMeasure::Kilogram => "kg",
            UnitOfMeasure::Milliliter => "ml",
            UnitOfMeasure::Liter => "l",
            UnitOfMeasure::Each => "each",
        };
        write!(f, "{name}")
    }
}

/// One ingredient line on a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub ingredient_id: EntityId,
    pub name: String,

    /// Quantity as written on the recipe card.
    pub quantity: Decimal,

    pub unit: UnitOfMeasure,

    /// Expected preparation waste, in percent. Must be in `[0, 100)`.
    pub waste_percentage: Decimal,

    /// Last known purchase cost per unit.
    pub unit_cost: Decimal,
}

impl RecipeIngredient {
    /// Quantity adjusted upward for expected waste:
    /// `quantity / (1 - waste/100)`.
    pub fn effective_quantity(&self) -> Decimal {
        self.quantity / (Decimal::ONE - self.waste_percentage / Decimal::ONE_HUNDRED)
    }

    /// Cost of this line: `effective_quantity * unit_cost`, rounded to 4 dp.
    pub fn line_cost(&self) -> Decimal {
        round_line(self.effective_quantity() * self.unit_cost)
    }

    pub(crate) fn validate(&self) -> Result<(), CostingError> {
        if self.quantity <= Decimal::ZERO {
            return Err(CostingError::InvalidQuantity(self.quantity));
        }
        if self.waste_percentage < Decimal::ZERO || self.waste_percentage >= Decimal::ONE_HUNDRED {
            return Err(CostingError::InvalidWastePercentage(self.waste_percentage));
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(CostingError::InvalidUnitCost(self.unit_cost));
        }
        Ok(())
    }
}

/// Per-line cost detail inside a [`CostBreakdown`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCost {
    pub ingredient_id: EntityId,
    pub name: String,
    pub effective_quantity: Decimal,
    pub line_cost: Decimal,
}

/// Full cost calculation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub lines: Vec<LineCost>,
    pub total_ingredient_cost: Decimal,
    pub cost_per_portion: Decimal,
    pub menu_price: Option<Decimal>,

    /// `cost_per_portion / menu_price`, when a menu price was supplied.
    pub cost_percentage: Option<Decimal>,

    /// `1 - cost_percentage`.
    pub gross_margin_percent: Option<Decimal>,
    pub calculated_at: DateTime<Utc>,
}

/// An immutable point-in-time record of a recipe's cost.
///
/// Creating a snapshot never mutates the live cost fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub captured_at: DateTime<Utc>,
    pub cost_per_portion: Decimal,
    pub menu_price: Option<Decimal>,
    pub cost_percentage: Option<Decimal>,
    pub gross_margin_percent: Option<Decimal>,
    pub notes: Option<String>,
}

/// A recipe with its ingredient lines and derived portion cost.
///
/// Invariant: after every mutating command, `current_cost_per_portion`
/// equals the cost recomputed from the live ingredient lines. A recipe with
/// no ingredients costs zero and is stale (`cost_calculated_at == None`)
/// rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipe {
    pub(crate) id: Option<EntityId>,
    pub(crate) menu_item_id: Option<EntityId>,
    pub(crate) name: String,
    pub(crate) ingredients: Vec<RecipeIngredient>,
    pub(crate) portion_yield: u32,
    pub(crate) current_cost_per_portion: Decimal,
    pub(crate) cost_calculated_at: Option<DateTime<Utc>>,
    pub(crate) cost_history: Vec<CostSnapshot>,
}

// Query methods
impl Recipe {
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn menu_item_id(&self) -> Option<EntityId> {
        self.menu_item_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ingredients(&self) -> &[RecipeIngredient] {
        &self.ingredients
    }

    pub fn portion_yield(&self) -> u32 {
        self.portion_yield
    }

    pub fn current_cost_per_portion(&self) -> Decimal {
        self.current_cost_per_portion
    }

    pub fn cost_calculated_at(&self) -> Option<DateTime<Utc>> {
        self.cost_calculated_at
    }

    /// A recipe is stale until a cost calculation has run against at least
    /// one ingredient line.
    pub fn is_stale(&self) -> bool {
        self.cost_calculated_at.is_none()
    }

    pub fn cost_history(&self) -> &[CostSnapshot] {
        &self.cost_history
    }

    pub(crate) fn ingredient_ids(&self) -> Vec<EntityId> {
        self.ingredients.iter().map(|i| i.ingredient_id).collect()
    }

    /// Portion cost recomputed from the live lines via the documented
    /// formula. Equal to `current_cost_per_portion` after every mutating
    /// command.
    pub fn cost_from_lines(&self) -> Decimal {
        if self.ingredients.is_empty() || self.portion_yield == 0 {
            return Decimal::ZERO;
        }
        let total: Decimal = self.ingredients.iter().map(|i| i.line_cost()).sum();
        round_portion(total / Decimal::from(self.portion_yield))
    }
}

// Mutation helpers used by the command handler.
impl Recipe {
    pub(crate) fn recompute(&mut self, now: DateTime<Utc>) {
        self.current_cost_per_portion = self.cost_from_lines();
        self.cost_calculated_at = if self.ingredients.is_empty() {
            None
        } else {
            Some(now)
        };
    }

    pub(crate) fn breakdown(
        &self,
        menu_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> CostBreakdown {
        let lines: Vec<LineCost> = self
            .ingredients
            .iter()
            .map(|i| LineCost {
                ingredient_id: i.ingredient_id,
                name: i.name.clone(),
                effective_quantity: i.effective_quantity(),
                line_cost: i.line_cost(),
            })
            .collect();

        let total_ingredient_cost: Decimal = lines.iter().map(|l| l.line_cost).sum();
        let cost_per_portion = self.cost_from_lines();

        let cost_percentage = menu_price
            .filter(|price| *price > Decimal::ZERO)
            .map(|price| round_ratio(cost_per_portion / price));
        let gross_margin_percent = cost_percentage.map(|pct| Decimal::ONE - pct);

        CostBreakdown {
            lines,
            total_ingredient_cost,
            cost_per_portion,
            menu_price,
            cost_percentage,
            gross_margin_percent,
            calculated_at: now,
        }
    }
}

/// Errors produced by recipe commands.
#[derive(Debug, Error)]
pub enum CostingError {
    #[error("recipe already exists")]
    AlreadyExists,

    #[error("recipe not found")]
    NotFound,

    #[error("portion yield must be positive, got {0}")]
    InvalidPortionYield(u32),

    #[error("ingredient quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    #[error("waste percentage must be in [0, 100), got {0}")]
    InvalidWastePercentage(Decimal),

    #[error("unit cost must not be negative, got {0}")]
    InvalidUnitCost(Decimal),

    #[error("menu price must be positive, got {0}")]
    InvalidMenuPrice(Decimal),

    #[error("ingredient {0} is already on the recipe")]
    DuplicateIngredient(EntityId),

    #[error("ingredient {0} is not on the recipe")]
    IngredientNotFound(EntityId),
}

impl ErrorCode for CostingError {
    fn error_code(&self) -> &'static str {
        match self {
            CostingError::AlreadyExists => "recipe_already_exists",
            CostingError::NotFound => "recipe_not_found",
            CostingError::InvalidPortionYield(_) => "invalid_portion_yield",
            CostingError::InvalidQuantity(_) => "invalid_quantity",
            CostingError::InvalidWastePercentage(_) => "invalid_waste_percentage",
            CostingError::InvalidUnitCost(_) => "invalid_unit_cost",
            CostingError::InvalidMenuPrice(_) => "invalid_menu_price",
            CostingError::DuplicateIngredient(_) => "duplicate_ingredient",
            CostingError::IngredientNotFound(_) => "ingredient_not_found",
        }
    }

    fn retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flour() -> RecipeIngredient {
        RecipeIngredient {
            ingredient_id: EntityId::new(),
            name: "flour".to_string(),
            quantity: dec!(0.2),
            unit: UnitOfMeasure::Kilogram,
            waste_percentage: dec!(10),
            unit_cost: dec!(1.00),
        }
    }

    #[test]
    fn effective_quantity_adjusts_for_waste() {
        let ingredient = flour();
        // 0.2 / 0.9
        let expected = dec!(0.2) / dec!(0.9);
        assert_eq!(ingredient.effective_quantity(), expected);
    }

    #[test]
    fn line_cost_rounds_to_four_places() {
        assert_eq!(flour().line_cost(), dec!(0.2222));
    }

    #[test]
    fn zero_waste_line_cost_is_exact() {
        let cheese = RecipeIngredient {
            ingredient_id: EntityId::new(),
            name: "cheese".to_string(),
            quantity: dec!(0.05),
            unit: UnitOfMeasure::Kilogram,
            waste_percentage: dec!(0),
            unit_cost: dec!(8.00),
        };
        assert_eq!(cheese.line_cost(), dec!(0.4000));
    }

    #[test]
    fn validate_rejects_bad_lines() {
        let mut bad = flour();
        bad.quantity = dec!(0);
        assert!(matches!(
            bad.validate(),
            Err(CostingError::InvalidQuantity(_))
        ));

        let mut bad = flour();
        bad.waste_percentage = dec!(100);
        assert!(matches!(
            bad.validate(),
            Err(CostingError::InvalidWastePercentage(_))
        ));

        let mut bad = flour();
        bad.unit_cost = dec!(-0.5);
        assert!(matches!(
            bad.validate(),
            Err(CostingError::InvalidUnitCost(_))
        ));
    }

    #[test]
    fn empty_recipe_costs_zero_and_is_stale() {
        let mut recipe = Recipe {
            portion_yield: 4,
            ..Recipe::default()
        };
        recipe.recompute(Utc::now());

        assert_eq!(recipe.cost_from_lines(), Decimal::ZERO);
        assert_eq!(recipe.current_cost_per_portion(), Decimal::ZERO);
        assert!(recipe.is_stale());
    }

    #[test]
    fn breakdown_includes_margin_when_priced() {
        let mut recipe = Recipe {
            portion_yield: 1,
            ..Recipe::default()
        };
        recipe.ingredients.push(flour());
        recipe.recompute(Utc::now());

        let breakdown = recipe.breakdown(Some(dec!(2.00)), Utc::now());
        assert_eq!(breakdown.cost_per_portion, dec!(0.22));
        assert_eq!(breakdown.cost_percentage, Some(dec!(0.1100)));
        assert_eq!(breakdown.gross_margin_percent, Some(dec!(0.8900)));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(CostingError::NotFound.error_code(), "recipe_not_found");
        assert!(!CostingError::AlreadyExists.retryable());
    }
}
