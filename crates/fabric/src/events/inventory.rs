//! Inventory namespace events.

use common::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events that can occur on the inventory channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InventoryEvent {
    /// An ingredient's purchase cost changed.
    IngredientPriceChanged(IngredientPriceChangedData),

    /// Stock was consumed by a completed order.
    StockConsumed(StockConsumedData),

    /// A stock level crossed its low-stock threshold.
    StockLow(StockLowData),

    /// Stock was received from a supplier.
    StockReceived(StockReceivedData),
}

impl InventoryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::IngredientPriceChanged(_) => "IngredientPriceChanged",
            InventoryEvent::StockConsumed(_) => "StockConsumed",
            InventoryEvent::StockLow(_) => "StockLow",
            InventoryEvent::StockReceived(_) => "StockReceived",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientPriceChangedData {
    pub ingredient_id: EntityId,
    pub name: String,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockConsumedData {
    pub menu_item_id: EntityId,
    pub quantity: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLowData {
    pub menu_item_id: EntityId,
    pub level: Decimal,
    pub threshold: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReceivedData {
    pub menu_item_id: EntityId,
    pub quantity: Decimal,
}

impl InventoryEvent {
    pub fn ingredient_price_changed(
        ingredient_id: EntityId,
        name: impl Into<String>,
        previous_cost: Decimal,
        new_cost: Decimal,
    ) -> Self {
        InventoryEvent::IngredientPriceChanged(IngredientPriceChangedData {
            ingredient_id,
            name: name.into(),
            previous_cost,
            new_cost,
        })
    }

    pub fn stock_consumed(menu_item_id: EntityId, quantity: Decimal, remaining: Decimal) -> Self {
        InventoryEvent::StockConsumed(StockConsumedData {
            menu_item_id,
            quantity,
            remaining,
        })
    }

    pub fn stock_low(menu_item_id: EntityId, level: Decimal, threshold: Decimal) -> Self {
        InventoryEvent::StockLow(StockLowData {
            menu_item_id,
            level,
            threshold,
        })
    }

    pub fn stock_received(menu_item_id: EntityId, quantity: Decimal) -> Self {
        InventoryEvent::StockReceived(StockReceivedData {
            menu_item_id,
            quantity,
        })
    }
}
