//! Order namespace events, published by the external ordering surface.

use chrono::{DateTime, Utc};
use common::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A line on a completed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Menu item that was sold.
    pub menu_item_id: EntityId,

    /// Human-readable item name.
    pub name: String,

    /// Quantity sold.
    pub quantity: Decimal,
}

/// Events that can occur on the order channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was completed and paid.
    OrderCompleted(OrderCompletedData),

    /// A completed order was refunded.
    OrderRefunded(OrderRefundedData),

    /// Order was cancelled before completion.
    OrderCancelled(OrderCancelledData),
}

impl OrderEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCompleted(_) => "OrderCompleted",
            OrderEvent::OrderRefunded(_) => "OrderRefunded",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }
}

/// Data for OrderCompleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompletedData {
    /// The completed order.
    pub order_id: EntityId,

    /// Customer who placed the order, when known (loyalty chains need this).
    pub customer_id: Option<EntityId>,

    /// Total before discounts.
    pub gross_total: Decimal,

    /// Total actually charged.
    pub net_total: Decimal,

    /// Discounts applied.
    pub discount_total: Decimal,

    /// Number of distinct lines on the order.
    pub item_count: u32,

    /// Lines sold, for inventory consumption.
    pub lines: Vec<OrderLine>,

    /// When the order completed.
    pub completed_at: DateTime<Utc>,
}

/// Data for OrderRefunded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRefundedData {
    pub order_id: EntityId,
    pub customer_id: Option<EntityId>,
    pub amount: Decimal,
    pub reason: String,
    pub refunded_at: DateTime<Utc>,
}

/// Data for OrderCancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub order_id: EntityId,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Creates an OrderCompleted event.
    #[allow(clippy::too_many_arguments)]
    pub fn order_completed(
        order_id: EntityId,
        customer_id: Option<EntityId>,
        gross_total: Decimal,
        net_total: Decimal,
        discount_total: Decimal,
        item_count: u32,
        lines: Vec<OrderLine>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderCompleted(OrderCompletedData {
            order_id,
            customer_id,
            gross_total,
            net_total,
            discount_total,
            item_count,
            lines,
            completed_at,
        })
    }

    /// Creates an OrderRefunded event.
    pub fn order_refunded(
        order_id: EntityId,
        customer_id: Option<EntityId>,
        amount: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        OrderEvent::OrderRefunded(OrderRefundedData {
            order_id,
            customer_id,
            amount,
            reason: reason.into(),
            refunded_at: Utc::now(),
        })
    }

    /// Creates an OrderCancelled event.
    pub fn order_cancelled(order_id: EntityId, reason: impl Into<String>) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            order_id,
            reason: reason.into(),
            cancelled_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_type_names() {
        let event = OrderEvent::order_cancelled(EntityId::new(), "kitchen closed");
        assert_eq!(event.event_type(), "OrderCancelled");

        let event = OrderEvent::order_refunded(EntityId::new(), None, dec!(12.50), "cold food");
        assert_eq!(event.event_type(), "OrderRefunded");
    }

    #[test]
    fn completed_event_roundtrip() {
        let order_id = EntityId::new();
        let event = OrderEvent::order_completed(
            order_id,
            Some(EntityId::new()),
            dec!(25.00),
            dec!(22.50),
            dec!(2.50),
            2,
            vec![OrderLine {
                menu_item_id: EntityId::new(),
                name: "Margherita".to_string(),
                quantity: dec!(2),
            }],
            Utc::now(),
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: OrderEvent = serde_json::from_str(&json).unwrap();
        if let OrderEvent::OrderCompleted(data) = back {
            assert_eq!(data.order_id, order_id);
            assert_eq!(data.net_total, dec!(22.50));
            assert_eq!(data.lines.len(), 1);
        } else {
            panic!("expected OrderCompleted");
        }
    }
}
