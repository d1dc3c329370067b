//! Alerting reactor.
//!
//! Upstream: `inventory:StockLow` and `accounting:RecipeCostUpdated`.
//! Publishes `alert` events and keeps a recent-alerts read model.

use std::sync::Arc;

use async_trait::async_trait;
use common::EntityId;
use fabric::events::{AccountingEvent, AlertEvent, InventoryEvent};
use fabric::{DuplicateFilter, EventFabric, EventPayload, EventSource, Namespace, StreamEvent};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tokio::sync::RwLock;

use crate::reactor::Reactor;
use crate::Result;

struct AlertState {
    recent: Vec<AlertEvent>,
    seen: DuplicateFilter,
}

/// Raises operational alerts from inventory and accounting signals.
#[derive(Clone)]
pub struct AlertCenter {
    fabric: EventFabric,
    source_id: EntityId,

    /// A cost update at or above this ratio of the previous cost raises a
    /// spike alert.
    spike_ratio: Decimal,

    state: Arc<RwLock<AlertState>>,
}

impl AlertCenter {
    pub fn new(fabric: EventFabric) -> Self {
        Self::with_spike_ratio(fabric, dec!(1.2))
    }

    pub fn with_spike_ratio(fabric: EventFabric, spike_ratio: Decimal) -> Self {
        Self {
            fabric,
            source_id: EntityId::new(),
            spike_ratio,
            state: Arc::new(RwLock::new(AlertState {
                recent: Vec::new(),
                seen: DuplicateFilter::new(),
            })),
        }
    }

    /// Alerts raised so far, oldest first.
    pub async fn recent_alerts(&self) -> Vec<AlertEvent> {
        self.state.read().await.recent.clone()
    }
}

#[async_trait]
impl Reactor for AlertCenter {
    fn name(&self) -> &'static str {
        "alert_center"
    }

    fn namespaces(&self) -> &'static [Namespace] {
        &[Namespace::Inventory, Namespace::Accounting]
    }

    async fn handle(&self, event: &StreamEvent) -> Result<()> {
        let alert = {
            let mut state = self.state.write().await;
            if !state.seen.observe(event) {
                return Ok(());
            }

            let alert = match &event.payload {
                EventPayload::Inventory(InventoryEvent::StockLow(data)) => Some(
                    AlertEvent::low_stock(data.menu_item_id, data.level, data.threshold),
                ),
                EventPayload::Accounting(AccountingEvent::RecipeCostUpdated(data))
                    if data.previous_cost > Decimal::ZERO =>
                {
                    let ratio = (data.new_cost / data.previous_cost)
                        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
                    (ratio >= self.spike_ratio).then(|| {
                        AlertEvent::recipe_cost_spike(
                            data.recipe_id,
                            data.previous_cost,
                            data.new_cost,
                            ratio,
                        )
                    })
                }
                _ => None,
            };

            if let Some(alert) = &alert {
                state.recent.push(alert.clone());
            }
            alert
        };

        if let Some(alert) = alert {
            self.fabric
                .publish(StreamEvent::new(
                    event.organization,
                    EventSource::new("alert", self.source_id),
                    EventPayload::Alert(alert),
                ))
                .await;
        }
        Ok(())
    }
}
