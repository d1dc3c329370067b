//! Inventory consumption reactor.
//!
//! Upstream: `order:OrderCompleted`. Decrements the stock ledger for each
//! line sold and publishes `inventory:StockConsumed`, plus
//! `inventory:StockLow` when a level first crosses its threshold.
//! Duplicate deliveries are filtered by source event ID.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{EntityId, TenantId};
use fabric::events::{InventoryEvent, OrderEvent};
use fabric::{
    DuplicateFilter, EventFabric, EventPayload, EventSource, Namespace, StreamEvent,
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::reactor::Reactor;
use crate::Result;

/// Tracked stock for one menu item.
#[derive(Debug, Clone)]
pub struct StockLevel {
    pub menu_item_id: EntityId,
    pub name: String,
    pub on_hand: Decimal,
    pub low_stock_threshold: Decimal,
}

struct InventoryState {
    levels: HashMap<(TenantId, EntityId), StockLevel>,
    seen: DuplicateFilter,
}

/// Read model + publisher for stock consumption.
#[derive(Clone)]
pub struct InventoryConsumption {
    fabric: EventFabric,
    state: Arc<RwLock<InventoryState>>,
}

impl InventoryConsumption {
    /// Creates an empty ledger over the fabric.
    pub fn new(fabric: EventFabric) -> Self {
        Self {
            fabric,
            state: Arc::new(RwLock::new(InventoryState {
                levels: HashMap::new(),
                seen: DuplicateFilter::new(),
            })),
        }
    }

    /// Seeds or replaces the tracked stock for a menu item.
    pub async fn set_stock(
        &self,
        tenant: TenantId,
        menu_item_id: EntityId,
        name: impl Into<String>,
        on_hand: Decimal,
        low_stock_threshold: Decimal,
    ) {
        self.state.write().await.levels.insert(
            (tenant, menu_item_id),
            StockLevel {
                menu_item_id,
                name: name.into(),
                on_hand,
                low_stock_threshold,
            },
        );
    }

    /// Current level for a menu item, if tracked.
    pub async fn level(&self, tenant: TenantId, menu_item_id: EntityId) -> Option<StockLevel> {
        self.state
            .read()
            .await
            .levels
            .get(&(tenant, menu_item_id))
            .cloned()
    }
}

#[async_trait]
impl Reactor for InventoryConsumption {
    fn name(&self) -> &'static str {
        "inventory_consumption"
    }

    fn namespaces(&self) -> &'static [Namespace] {
        &[Namespace::Order]
    }

    async fn handle(&self, event: &StreamEvent) -> Result<()> {
        let EventPayload::Order(order_event) = &event.payload else {
            return Ok(());
        };

        let data = match order_event {
            OrderEvent::OrderCompleted(data) => data,
            OrderEvent::OrderRefunded(_) | OrderEvent::OrderCancelled(_) => return Ok(()),
        };

        let mut to_publish = Vec::new();
        {
            let mut state = self.state.write().await;
            if !state.seen.observe(event) {
                return Ok(());
            }

            for line in &data.lines {
                let Some(level) = state.levels.get_mut(&(event.organization, line.menu_item_id))
                else {
                    continue;
                };

                let was_above = level.on_hand > level.low_stock_threshold;
                level.on_hand -= line.quantity;

                to_publish.push(StreamEvent::new(
                    event.organization,
                    EventSource::new("inventory", line.menu_item_id),
                    EventPayload::Inventory(InventoryEvent::stock_consumed(
                        line.menu_item_id,
                        line.quantity,
                        level.on_hand,
                    )),
                ));

                if was_above && level.on_hand <= level.low_stock_threshold {
                    to_publish.push(StreamEvent::new(
                        event.organization,
                        EventSource::new("inventory", line.menu_item_id),
                        EventPayload::Inventory(InventoryEvent::stock_low(
                            line.menu_item_id,
                            level.on_hand,
                            level.low_stock_threshold,
                        )),
                    ));
                }
            }
        }

        for outgoing in to_publish {
            self.fabric.publish(outgoing).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fabric::events::OrderLine;
    use rust_decimal_macros::dec;

    fn completed_order(tenant: TenantId, item: EntityId, quantity: Decimal) -> StreamEvent {
        StreamEvent::new(
            tenant,
            EventSource::new("order", EntityId::new()),
            EventPayload::Order(OrderEvent::order_completed(
                EntityId::new(),
                None,
                dec!(20),
                dec!(20),
                dec!(0),
                1,
                vec![OrderLine {
                    menu_item_id: item,
                    name: "Margherita".to_string(),
                    quantity,
                }],
                Utc::now(),
            )),
        )
    }

    #[tokio::test]
    async fn consumption_decrements_and_raises_low_stock_once() {
        let fabric = EventFabric::new();
        let reactor = InventoryConsumption::new(fabric.clone());
        let tenant = TenantId::new();
        let item = EntityId::new();

        reactor
            .set_stock(tenant, item, "Margherita", dec!(10), dec!(8))
            .await;

        reactor
            .handle(&completed_order(tenant, item, dec!(1)))
            .await
            .unwrap();
        let level = reactor.level(tenant, item).await.unwrap();
        assert_eq!(level.on_hand, dec!(9));

        // Crosses the threshold here.
        reactor
            .handle(&completed_order(tenant, item, dec!(2)))
            .await
            .unwrap();

        let events = fabric.events_in(Namespace::Inventory).await;
        let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["StockConsumed", "StockConsumed", "StockLow"]);
    }

    #[tokio::test]
    async fn duplicate_delivery_consumes_once() {
        let fabric = EventFabric::new();
        let reactor = InventoryConsumption::new(fabric.clone());
        let tenant = TenantId::new();
        let item = EntityId::new();

        reactor
            .set_stock(tenant, item, "Margherita", dec!(10), dec!(2))
            .await;

        let event = completed_order(tenant, item, dec!(3));
        reactor.handle(&event).await.unwrap();
        reactor.handle(&event).await.unwrap();

        let level = reactor.level(tenant, item).await.unwrap();
        assert_eq!(level.on_hand, dec!(7));
        assert_eq!(fabric.len(Namespace::Inventory).await, 1);
    }

    #[tokio::test]
    async fn untracked_items_are_ignored() {
        let fabric = EventFabric::new();
        let reactor = InventoryConsumption::new(fabric.clone());
        let tenant = TenantId::new();

        reactor
            .handle(&completed_order(tenant, EntityId::new(), dec!(1)))
            .await
            .unwrap();
        assert!(fabric.is_empty(Namespace::Inventory).await);
    }
}
