//! Sales aggregation reactor.
//!
//! Upstream: `order` events. Maintains per-tenant, per-business-date
//! totals and republishes the rolling figures on the sales channel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{EntityId, TenantId};
use fabric::events::{OrderEvent, SalesEvent};
use fabric::{DuplicateFilter, EventFabric, EventPayload, EventSource, Namespace, StreamEvent};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::reactor::Reactor;
use crate::Result;

/// Rolling totals for one business date.
#[derive(Debug, Clone, Default)]
pub struct DailySales {
    pub orders: u64,
    pub gross_total: Decimal,
    pub net_total: Decimal,
    pub discount_total: Decimal,
    pub refund_total: Decimal,
    pub items: u64,
}

struct SalesState {
    days: HashMap<(TenantId, NaiveDate), DailySales>,
    seen: DuplicateFilter,
}

/// Query-side read model for daily sales.
#[derive(Clone)]
pub struct SalesAggregation {
    fabric: EventFabric,
    source_id: EntityId,
    state: Arc<RwLock<SalesState>>,
}

impl SalesAggregation {
    pub fn new(fabric: EventFabric) -> Self {
        Self {
            fabric,
            source_id: EntityId::new(),
            state: Arc::new(RwLock::new(SalesState {
                days: HashMap::new(),
                seen: DuplicateFilter::new(),
            })),
        }
    }

    /// Totals for a tenant and business date, if any orders landed there.
    pub async fn daily(&self, tenant: TenantId, date: NaiveDate) -> Option<DailySales> {
        self.state.read().await.days.get(&(tenant, date)).cloned()
    }
}

#[async_trait]
impl Reactor for SalesAggregation {
    fn name(&self) -> &'static str {
        "sales_aggregation"
    }

    fn namespaces(&self) -> &'static [Namespace] {
        &[Namespace::Order]
    }

    async fn handle(&self, event: &StreamEvent) -> Result<()> {
        let EventPayload::Order(order_event) = &event.payload else {
            return Ok(());
        };

        let updated = {
            let mut state = self.state.write().await;
            if !state.seen.observe(event) {
                return Ok(());
            }

            match order_event {
                OrderEvent::OrderCompleted(data) => {
                    let date = data.completed_at.date_naive();
                    let day = state
                        .days
                        .entry((event.organization, date))
                        .or_default();
                    day.orders += 1;
                    day.gross_total += data.gross_total;
                    day.net_total += data.net_total;
                    day.discount_total += data.discount_total;
                    day.items += u64::from(data.item_count);
                    Some((date, day.clone()))
                }
                OrderEvent::OrderRefunded(data) => {
                    let date = data.refunded_at.date_naive();
                    let day = state
                        .days
                        .entry((event.organization, date))
                        .or_default();
                    day.refund_total += data.amount;
                    Some((date, day.clone()))
                }
                OrderEvent::OrderCancelled(_) => None,
            }
        };

        if let Some((date, day)) = updated {
            self.fabric
                .publish(StreamEvent::new(
                    event.organization,
                    EventSource::new("sales", self.source_id),
                    EventPayload::Sales(SalesEvent::daily_sales_updated(
                        event.organization,
                        date,
                        day.orders,
                        day.gross_total,
                        day.net_total,
                    )),
                ))
                .await;
        }
        Ok(())
    }
}
