//! Recipe command handling.

use std::collections::HashMap;

use chrono::Utc;
use common::{EntityId, EventId};
use fabric::events::AccountingEvent;
use fabric::events::accounting::RecipeCostUpdatedData;
use fabric::{EventPayload, EventSource, StreamEvent};
use runtime::{ActorBehavior, Applied, CommandContext};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::recipe::{CostBreakdown, CostSnapshot, CostingError, Recipe, RecipeIngredient, UnitOfMeasure};

/// Commands accepted by the recipe actor.
#[derive(Debug, Clone)]
pub enum RecipeCommand {
    Create {
        menu_item_id: Option<EntityId>,
        name: String,
        portion_yield: u32,
        ingredients: Vec<RecipeIngredient>,
    },
    Update {
        name: Option<String>,
        menu_item_id: Option<EntityId>,
        portion_yield: Option<u32>,
    },
    AddIngredient(RecipeIngredient),
    UpdateIngredient {
        ingredient_id: EntityId,
        quantity: Option<Decimal>,
        unit: Option<UnitOfMeasure>,
        waste_percentage: Option<Decimal>,
        unit_cost: Option<Decimal>,
    },
    RemoveIngredient {
        ingredient_id: EntityId,
    },
    CalculateCost {
        menu_price: Option<Decimal>,
    },
    /// Replaces unit costs for the ingredients present in the map;
    /// ingredients absent from the map keep their last known cost.
    RecalculateFromPrices {
        prices: HashMap<EntityId, Decimal>,
        source_event: Option<EventId>,
    },
    CreateCostSnapshot {
        menu_price: Option<Decimal>,
        notes: Option<String>,
    },
    GetCostHistory {
        count: usize,
    },
}

/// Responses from the recipe actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecipeResponse {
    Updated {
        cost_per_portion: Decimal,
        stale: bool,
    },
    Cost(CostBreakdown),
    SnapshotCreated(CostSnapshot),
    History(Vec<CostSnapshot>),
}

impl ActorBehavior for Recipe {
    type Command = RecipeCommand;
    type Response = RecipeResponse;
    type Error = CostingError;

    fn actor_type() -> &'static str {
        "recipe"
    }

    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error> {
        let now = Utc::now();

        match command {
            RecipeCommand::Create {
                menu_item_id,
                name,
                portion_yield,
                ingredients,
            } => {
                if self.id.is_some() {
                    return Err(CostingError::AlreadyExists);
                }
                if portion_yield == 0 {
                    return Err(CostingError::InvalidPortionYield(portion_yield));
                }
                for ingredient in &ingredients {
                    ingredient.validate()?;
                }
                if let Some(duplicate) = first_duplicate(&ingredients) {
                    return Err(CostingError::DuplicateIngredient(duplicate));
                }

                let mut next = Recipe {
                    id: Some(ctx.key.entity),
                    menu_item_id,
                    name,
                    ingredients,
                    portion_yield,
                    ..Recipe::default()
                };
                next.recompute(now);
                Ok(mutation(ctx, self.current_cost_per_portion, next))
            }

            RecipeCommand::Update {
                name,
                menu_item_id,
                portion_yield,
            } => {
                self.ensure_exists()?;
                let mut next = self.clone();
                if let Some(name) = name {
                    next.name = name;
                }
                if let Some(menu_item_id) = menu_item_id {
                    next.menu_item_id = Some(menu_item_id);
                }
                if let Some(portion_yield) = portion_yield {
                    if portion_yield == 0 {
                        return Err(CostingError::InvalidPortionYield(portion_yield));
                    }
                    next.portion_yield = portion_yield;
                }
                next.recompute(now);
                Ok(mutation(ctx, self.current_cost_per_portion, next))
            }

            RecipeCommand::AddIngredient(ingredient) => {
                self.ensure_exists()?;
                ingredient.validate()?;
                if self
                    .ingredients
                    .iter()
                    .any(|i| i.ingredient_id == ingredient.ingredient_id)
                {
                    return Err(CostingError::DuplicateIngredient(ingredient.ingredient_id));
                }

                let mut next = self.clone();
                next.ingredients.push(ingredient);
                next.recompute(now);
                Ok(mutation(ctx, self.current_cost_per_portion, next))
            }

            RecipeCommand::UpdateIngredient {
                ingredient_id,
                quantity,
                unit,
                waste_percentage,
                unit_cost,
            } => {
                self.ensure_exists()?;
                let mut next = self.clone();
                let line = next
                    .ingredients
                    .iter_mut()
                    .find(|i| i.ingredient_id == ingredient_id)
                    .ok_or(CostingError::IngredientNotFound(ingredient_id))?;

                if let Some(quantity) = quantity {
                    line.quantity = quantity;
                }
                if let Some(unit) = unit {
                    line.unit = unit;
                }
                if let Some(waste) = waste_percentage {
                    line.waste_percentage = waste;
                }
                if let Some(cost) = unit_cost {
                    line.unit_cost = cost;
                }
                line.validate()?;

                next.recompute(now);
                Ok(mutation(ctx, self.current_cost_per_portion, next))
            }

            RecipeCommand::RemoveIngredient { ingredient_id } => {
                self.ensure_exists()?;
                if !self
                    .ingredients
                    .iter()
                    .any(|i| i.ingredient_id == ingredient_id)
                {
                    return Err(CostingError::IngredientNotFound(ingredient_id));
                }

                let mut next = self.clone();
                next.ingredients.retain(|i| i.ingredient_id != ingredient_id);
                next.recompute(now);
                Ok(mutation(ctx, self.current_cost_per_portion, next))
            }

            RecipeCommand::CalculateCost { menu_price } => {
                self.ensure_exists()?;
                validate_menu_price(menu_price)?;

                let mut next = self.clone();
                next.recompute(now);
                let breakdown = next.breakdown(menu_price, now);
                let events = cost_events(ctx, self.current_cost_per_portion, &next);
                Ok(Applied::new(next, RecipeResponse::Cost(breakdown)).with_events(events))
            }

            RecipeCommand::RecalculateFromPrices {
                prices,
                source_event,
            } => {
                self.ensure_exists()?;
                for cost in prices.values() {
                    if *cost < Decimal::ZERO {
                        return Err(CostingError::InvalidUnitCost(*cost));
                    }
                }

                let mut next = self.clone();
                for line in &mut next.ingredients {
                    if let Some(cost) = prices.get(&line.ingredient_id) {
                        line.unit_cost = *cost;
                    }
                }
                next.recompute(now);
                Ok(mutation(ctx, self.current_cost_per_portion, next).from_event(source_event))
            }

            RecipeCommand::CreateCostSnapshot { menu_price, notes } => {
                self.ensure_exists()?;
                validate_menu_price(menu_price)?;

                let breakdown = self.breakdown(menu_price, now);
                let snapshot = CostSnapshot {
                    captured_at: now,
                    cost_per_portion: breakdown.cost_per_portion,
                    menu_price,
                    cost_percentage: breakdown.cost_percentage,
                    gross_margin_percent: breakdown.gross_margin_percent,
                    notes,
                };

                let mut next = self.clone();
                next.cost_history.push(snapshot.clone());
                // History grows but the live cost fields stay untouched.
                Ok(Applied::new(next, RecipeResponse::SnapshotCreated(snapshot)))
            }

            RecipeCommand::GetCostHistory { count } => {
                self.ensure_exists()?;
                let history: Vec<CostSnapshot> = self
                    .cost_history
                    .iter()
                    .rev()
                    .take(count)
                    .cloned()
                    .collect();
                Ok(Applied::read_only(
                    self.clone(),
                    RecipeResponse::History(history),
                ))
            }
        }
    }
}

impl Recipe {
    fn ensure_exists(&self) -> Result<(), CostingError> {
        if self.id.is_none() {
            return Err(CostingError::NotFound);
        }
        Ok(())
    }
}

fn validate_menu_price(menu_price: Option<Decimal>) -> Result<(), CostingError> {
    if let Some(price) = menu_price
        && price <= Decimal::ZERO
    {
        return Err(CostingError::InvalidMenuPrice(price));
    }
    Ok(())
}

fn first_duplicate(ingredients: &[RecipeIngredient]) -> Option<EntityId> {
    let mut seen = std::collections::HashSet::new();
    for ingredient in ingredients {
        if !seen.insert(ingredient.ingredient_id) {
            return Some(ingredient.ingredient_id);
        }
    }
    None
}

fn mutation(ctx: &CommandContext, previous_cost: Decimal, next: Recipe) -> Applied<Recipe> {
    let events = cost_events(ctx, previous_cost, &next);
    let response = RecipeResponse::Updated {
        cost_per_portion: next.current_cost_per_portion,
        stale: next.is_stale(),
    };
    Applied::new(next, response).with_events(events)
}

fn cost_events(ctx: &CommandContext, previous_cost: Decimal, next: &Recipe) -> Vec<StreamEvent> {
    if next.current_cost_per_portion == previous_cost {
        return Vec::new();
    }
    vec![StreamEvent::new(
        ctx.key.tenant,
        EventSource::new(ctx.key.actor_type, ctx.key.entity),
        EventPayload::Accounting(AccountingEvent::RecipeCostUpdated(RecipeCostUpdatedData {
            recipe_id: ctx.key.entity,
            menu_item_id: next.menu_item_id,
            previous_cost,
            new_cost: next.current_cost_per_portion,
            ingredient_ids: next.ingredient_ids(),
        })),
    )]
}
