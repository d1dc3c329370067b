//! Alert namespace events.

use common::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events that can occur on the alert channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AlertEvent {
    /// A menu item's stock dropped below its threshold.
    LowStock(LowStockData),

    /// A recipe's portion cost jumped above the configured spike ratio.
    RecipeCostSpike(RecipeCostSpikeData),
}

impl AlertEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AlertEvent::LowStock(_) => "LowStock",
            AlertEvent::RecipeCostSpike(_) => "RecipeCostSpike",
        }
    }

    pub fn low_stock(menu_item_id: EntityId, level: Decimal, threshold: Decimal) -> Self {
        AlertEvent::LowStock(LowStockData {
            menu_item_id,
            level,
            threshold,
        })
    }

    pub fn recipe_cost_spike(
        recipe_id: EntityId,
        previous_cost: Decimal,
        new_cost: Decimal,
        ratio: Decimal,
    ) -> Self {
        AlertEvent::RecipeCostSpike(RecipeCostSpikeData {
            recipe_id,
            previous_cost,
            new_cost,
            ratio,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockData {
    pub menu_item_id: EntityId,
    pub level: Decimal,
    pub threshold: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCostSpikeData {
    pub recipe_id: EntityId,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
    /// new_cost / previous_cost at the time of the spike.
    pub ratio: Decimal,
}
