//! Booking-deposit namespace events.

use common::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events that can occur on the booking-deposit channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingDepositEvent {
    /// A deposit was taken when a booking was made.
    DepositTaken(DepositTakenData),

    /// A deposit was released back to the customer.
    DepositReleased(DepositReleasedData),

    /// A deposit was forfeited (no-show or late cancellation).
    DepositForfeited(DepositForfeitedData),
}

impl BookingDepositEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BookingDepositEvent::DepositTaken(_) => "DepositTaken",
            BookingDepositEvent::DepositReleased(_) => "DepositReleased",
            BookingDepositEvent::DepositForfeited(_) => "DepositForfeited",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositTakenData {
    pub booking_id: EntityId,
    pub customer_id: Option<EntityId>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositReleasedData {
    pub booking_id: EntityId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositForfeitedData {
    pub booking_id: EntityId,
    pub amount: Decimal,
    pub reason: String,
}
