//! Gift-card namespace events.

use common::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events that can occur on the gift-card channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GiftCardEvent {
    /// A gift card was issued.
    GiftCardIssued(GiftCardIssuedData),

    /// Value was redeemed from a gift card.
    GiftCardRedeemed(GiftCardRedeemedData),

    /// Value was loaded onto an existing gift card.
    GiftCardReloaded(GiftCardReloadedData),
}

impl GiftCardEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            GiftCardEvent::GiftCardIssued(_) => "GiftCardIssued",
            GiftCardEvent::GiftCardRedeemed(_) => "GiftCardRedeemed",
            GiftCardEvent::GiftCardReloaded(_) => "GiftCardReloaded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardIssuedData {
    pub card_id: EntityId,
    pub initial_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardRedeemedData {
    pub card_id: EntityId,
    pub amount: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardReloadedData {
    pub card_id: EntityId,
    pub amount: Decimal,
    pub remaining: Decimal,
}
