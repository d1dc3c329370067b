//! Price-change reaction.
//!
//! Upstream: `inventory:IngredientPriceChanged`, plus
//! `accounting:RecipeCostUpdated` to maintain the ingredient-to-recipe
//! index (cost events carry the recipe's ingredient IDs). A recipe joins
//! the index after its first cost calculation, so reaction to price
//! changes is eventually consistent with recipe creation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{EntityId, TenantId};
use domain::{Recipe, RecipeCommand};
use entity_store::EntityStore;
use fabric::events::{AccountingEvent, InventoryEvent};
use fabric::{EventPayload, Namespace, StreamEvent};
use runtime::{ActorRuntime, ErrorCode};
use tokio::sync::RwLock;

use crate::reactor::Reactor;
use crate::{ReactorError, Result};

type IngredientIndex = HashMap<(TenantId, EntityId), HashSet<EntityId>>;

/// Re-costs recipes when ingredient purchase prices move.
pub struct PriceReaction<S: EntityStore + 'static> {
    recipes: ActorRuntime<Recipe, S>,
    index: Arc<RwLock<IngredientIndex>>,
}

impl<S: EntityStore + 'static> PriceReaction<S> {
    pub fn new(recipes: ActorRuntime<Recipe, S>) -> Self {
        Self {
            recipes,
            index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Recipes currently indexed for an ingredient.
    pub async fn recipes_for(&self, tenant: TenantId, ingredient_id: EntityId) -> Vec<EntityId> {
        self.index
            .read()
            .await
            .get(&(tenant, ingredient_id))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    async fn reindex(&self, tenant: TenantId, recipe_id: EntityId, ingredient_ids: &[EntityId]) {
        let mut index = self.index.write().await;
        // Drop stale memberships first so removed ingredients stop
        // triggering this recipe.
        for recipes in index.values_mut() {
            recipes.remove(&recipe_id);
        }
        for ingredient_id in ingredient_ids {
            index
                .entry((tenant, *ingredient_id))
                .or_default()
                .insert(recipe_id);
        }
    }
}

#[async_trait]
impl<S: EntityStore + 'static> Reactor for PriceReaction<S> {
    fn name(&self) -> &'static str {
        "price_reaction"
    }

    fn namespaces(&self) -> &'static [Namespace] {
        &[Namespace::Inventory, Namespace::Accounting]
    }

    async fn handle(&self, event: &StreamEvent) -> Result<()> {
        match &event.payload {
            EventPayload::Accounting(AccountingEvent::RecipeCostUpdated(data)) => {
                self.reindex(event.organization, data.recipe_id, &data.ingredient_ids)
                    .await;
                Ok(())
            }

            EventPayload::Inventory(InventoryEvent::IngredientPriceChanged(data)) => {
                let targets = self
                    .recipes_for(event.organization, data.ingredient_id)
                    .await;

                for recipe_id in targets {
                    let mut prices = HashMap::new();
                    prices.insert(data.ingredient_id, data.new_cost);

                    let result = self
                        .recipes
                        .dispatch(
                            event.organization,
                            recipe_id,
                            RecipeCommand::RecalculateFromPrices {
                                prices,
                                source_event: Some(event.event_id),
                            },
                        )
                        .await;

                    match result {
                        Ok(_) => {}
                        // Re-delivery is safe: recalculating with the same
                        // price map converges and emits no further events.
                        Err(err) if err.retryable() => {
                            return Err(ReactorError::Dispatch(err.to_string()));
                        }
                        Err(err) => {
                            tracing::warn!(
                                error = %err,
                                %recipe_id,
                                "recipe rejected price recalculation"
                            );
                        }
                    }
                }
                Ok(())
            }

            _ => Ok(()),
        }
    }
}
