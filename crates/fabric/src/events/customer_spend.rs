//! Customer-spend namespace events, published by the loyalty projection actor.
//!
//! `SpendRecorded`, `PointsEarned`, and `TierChanged` for one order are
//! emitted in a single batch, atomic with the actor's state write, so a
//! duplicate delivery replays the whole batch or none of it.

use common::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events that can occur on the customer-spend channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustomerSpendEvent {
    /// Net spend for an order was applied to the projection.
    SpendRecorded(SpendRecordedData),

    /// Points were earned for an order.
    PointsEarned(PointsEarnedData),

    /// Points were redeemed against a reward.
    PointsRedeemed(PointsRedeemedData),

    /// A previously recorded order's spend was reversed.
    SpendReversed(SpendReversedData),

    /// The customer's loyalty tier changed.
    TierChanged(TierChangedData),
}

impl CustomerSpendEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CustomerSpendEvent::SpendRecorded(_) => "SpendRecorded",
            CustomerSpendEvent::PointsEarned(_) => "PointsEarned",
            CustomerSpendEvent::PointsRedeemed(_) => "PointsRedeemed",
            CustomerSpendEvent::SpendReversed(_) => "SpendReversed",
            CustomerSpendEvent::TierChanged(_) => "TierChanged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRecordedData {
    pub customer_id: EntityId,
    pub order_id: EntityId,
    pub net_amount: Decimal,
    pub lifetime_spend: Decimal,
    pub year_to_date_spend: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsEarnedData {
    pub customer_id: EntityId,
    pub order_id: EntityId,
    pub points: i64,
    pub balance: i64,
    /// Tier whose multiplier rated this order (the pre-spend tier).
    pub tier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsRedeemedData {
    pub customer_id: EntityId,
    pub order_id: Option<EntityId>,
    pub points: i64,
    pub value: Decimal,
    pub balance: i64,
    pub reward_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendReversedData {
    pub customer_id: EntityId,
    pub order_id: EntityId,
    pub amount: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierChangedData {
    pub customer_id: EntityId,
    pub previous_tier: String,
    pub new_tier: String,
    pub year_to_date_spend: Decimal,
}
