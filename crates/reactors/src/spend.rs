//! Spend-projection chain driver.
//!
//! Upstream: `order:OrderCompleted` and `order:OrderRefunded`. Converts
//! order facts into loyalty commands, forming the eventual-consistency
//! chain: order completion -> spend recorded -> points earned -> tier
//! recalculated. Idempotency lives in the loyalty actor (per-order dedup),
//! so duplicate or re-delivered order events are safe; an out-of-order
//! refund for an order never recorded is logged and dropped.

use async_trait::async_trait;
use domain::{CustomerSpendProjection, LoyaltyCommand};
use entity_store::EntityStore;
use fabric::events::OrderEvent;
use fabric::{EventPayload, Namespace, StreamEvent};
use runtime::{ActorRuntime, DispatchError, ErrorCode};

use crate::reactor::Reactor;
use crate::{ReactorError, Result};

/// Drives the loyalty projection from order events.
pub struct SpendChain<S: EntityStore + 'static> {
    loyalty: ActorRuntime<CustomerSpendProjection, S>,
}

impl<S: EntityStore + 'static> SpendChain<S> {
    pub fn new(loyalty: ActorRuntime<CustomerSpendProjection, S>) -> Self {
        Self { loyalty }
    }

    fn settle<R>(
        result: std::result::Result<R, DispatchError<domain::LoyaltyError>>,
        context: &'static str,
    ) -> Result<()> {
        match result {
            Ok(_) => Ok(()),
            // Transient runtime failures bubble up for host re-delivery.
            Err(err) if err.retryable() => Err(ReactorError::Dispatch(err.to_string())),
            Err(err) => {
                tracing::warn!(error = %err, context, "loyalty command rejected");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<S: EntityStore + 'static> Reactor for SpendChain<S> {
    fn name(&self) -> &'static str {
        "spend_chain"
    }

    fn namespaces(&self) -> &'static [Namespace] {
        &[Namespace::Order]
    }

    async fn handle(&self, event: &StreamEvent) -> Result<()> {
        let EventPayload::Order(order_event) = &event.payload else {
            return Ok(());
        };

        match order_event {
            OrderEvent::OrderCompleted(data) => {
                let Some(customer_id) = data.customer_id else {
                    return Ok(());
                };

                let result = self
                    .loyalty
                    .dispatch(
                        event.organization,
                        customer_id,
                        LoyaltyCommand::RecordSpend {
                            order_id: data.order_id,
                            net_spend: data.net_total,
                            gross_spend: data.gross_total,
                            discount_amount: data.discount_total,
                            item_count: data.item_count,
                            date: data.completed_at,
                            source_event: Some(event.event_id),
                        },
                    )
                    .await;
                Self::settle(result, "record_spend")
            }

            OrderEvent::OrderRefunded(data) => {
                let Some(customer_id) = data.customer_id else {
                    return Ok(());
                };

                let result = self
                    .loyalty
                    .dispatch(
                        event.organization,
                        customer_id,
                        LoyaltyCommand::ReverseSpend {
                            order_id: data.order_id,
                            amount: data.amount,
                            reason: data.reason.clone(),
                            source_event: Some(event.event_id),
                        },
                    )
                    .await;
                Self::settle(result, "reverse_spend")
            }

            OrderEvent::OrderCancelled(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{EntityId, TenantId};
    use entity_store::InMemoryEntityStore;
    use fabric::{EventFabric, EventSource};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn order_completed(tenant: TenantId, customer: EntityId, order: EntityId) -> StreamEvent {
        StreamEvent::new(
            tenant,
            EventSource::new("order", order),
            EventPayload::Order(OrderEvent::order_completed(
                order,
                Some(customer),
                dec!(60),
                dec!(55),
                dec!(5),
                2,
                vec![],
                Utc::now(),
            )),
        )
    }

    #[tokio::test]
    async fn completed_order_records_spend_and_points() {
        let store = Arc::new(InMemoryEntityStore::new());
        let fabric = EventFabric::new();
        let loyalty = ActorRuntime::new(Arc::clone(&store), fabric.clone());
        let chain = SpendChain::new(loyalty.clone());

        let tenant = TenantId::new();
        let customer = EntityId::new();
        let event = order_completed(tenant, customer, EntityId::new());

        chain.handle(&event).await.unwrap();

        let (projection, _) = loyalty.snapshot(tenant, customer).await.unwrap().unwrap();
        assert_eq!(projection.lifetime_spend(), dec!(55));
        assert_eq!(projection.available_points(), 55);

        // Re-delivered event is absorbed by the actor's per-order dedup.
        chain.handle(&event).await.unwrap();
        let (projection, _) = loyalty.snapshot(tenant, customer).await.unwrap().unwrap();
        assert_eq!(projection.available_points(), 55);
    }

    #[tokio::test]
    async fn refund_before_record_is_dropped_not_retried() {
        let store = Arc::new(InMemoryEntityStore::new());
        let fabric = EventFabric::new();
        let loyalty = ActorRuntime::new(Arc::clone(&store), fabric.clone());
        let chain = SpendChain::new(loyalty);

        let event = StreamEvent::new(
            TenantId::new(),
            EventSource::new("order", EntityId::new()),
            EventPayload::Order(OrderEvent::order_refunded(
                EntityId::new(),
                Some(EntityId::new()),
                dec!(10),
                "never recorded",
            )),
        );

        assert!(chain.handle(&event).await.is_ok());
    }

    #[tokio::test]
    async fn anonymous_orders_are_ignored() {
        let store = Arc::new(InMemoryEntityStore::new());
        let fabric = EventFabric::new();
        let loyalty: ActorRuntime<CustomerSpendProjection, _> =
            ActorRuntime::new(Arc::clone(&store), fabric.clone());
        let chain = SpendChain::new(loyalty);

        let event = StreamEvent::new(
            TenantId::new(),
            EventSource::new("order", EntityId::new()),
            EventPayload::Order(OrderEvent::order_completed(
                EntityId::new(),
                None,
                dec!(20),
                dec!(20),
                dec!(0),
                1,
                vec![],
                Utc::now(),
            )),
        );

        chain.handle(&event).await.unwrap();
        assert_eq!(store.entry_count().await, 0);
    }
}
