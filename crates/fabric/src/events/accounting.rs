//! Accounting namespace events.

use common::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events that can occur on the accounting channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AccountingEvent {
    /// A recipe's portion cost was recalculated.
    RecipeCostUpdated(RecipeCostUpdatedData),

    /// A refund reached its succeeded state.
    RefundSettled(RefundSettledData),

    /// A refund reached its failed state.
    RefundFailed(RefundFailedData),
}

impl AccountingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AccountingEvent::RecipeCostUpdated(_) => "RecipeCostUpdated",
            AccountingEvent::RefundSettled(_) => "RefundSettled",
            AccountingEvent::RefundFailed(_) => "RefundFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCostUpdatedData {
    pub recipe_id: EntityId,
    pub menu_item_id: Option<EntityId>,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
    /// Ingredients on the recipe at recalculation time; price-change
    /// reactors index recipes by these.
    pub ingredient_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundSettledData {
    pub refund_id: EntityId,
    pub payment_id: EntityId,
    pub merchant_id: EntityId,
    pub amount: Decimal,
    pub processor_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundFailedData {
    pub refund_id: EntityId,
    pub payment_id: EntityId,
    pub merchant_id: EntityId,
    pub amount: Decimal,
    pub reason: String,
}
