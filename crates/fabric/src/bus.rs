//! In-process event fabric: a partitioned, append-only log per namespace
//! with offset-restartable subscriptions.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::{RwLock, watch};

use crate::envelope::StreamEvent;
use crate::namespace::Namespace;

/// A stream of `(offset, event)` pairs for one namespace.
///
/// The offset is the position within the namespace log; a subscriber that
/// acknowledges offset `n` can restart from `n + 1` and re-see nothing it
/// already processed. The stream is infinite: it follows live publishes
/// after the replay catches up.
pub type EventStream = Pin<Box<dyn Stream<Item = (usize, StreamEvent)> + Send>>;

struct Topic {
    log: RwLock<Vec<StreamEvent>>,
    len_tx: watch::Sender<usize>,
}

impl Topic {
    fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            log: RwLock::new(Vec::new()),
            len_tx,
        }
    }
}

/// Ordered, namespaced publish/subscribe between actors and reactors.
///
/// Delivery semantics:
/// - at-least-once: a subscriber restarting from an older offset re-sees
///   events, so consumers must be idempotent (see [`crate::DuplicateFilter`]);
/// - events published by the same source to the same namespace are observed
///   in publish order by every subscriber;
/// - no ordering is guaranteed across namespaces or across sources.
///
/// Publishing is fire-and-forget from the publisher's perspective: the event
/// is appended to the namespace log and subscribers drain it on their own
/// tasks.
#[derive(Clone)]
pub struct EventFabric {
    topics: Arc<HashMap<Namespace, Arc<Topic>>>,
}

impl EventFabric {
    /// Creates a fabric with one empty topic per namespace.
    pub fn new() -> Self {
        let topics = Namespace::ALL
            .iter()
            .map(|ns| (*ns, Arc::new(Topic::new())))
            .collect();
        Self {
            topics: Arc::new(topics),
        }
    }

    fn topic(&self, namespace: Namespace) -> &Arc<Topic> {
        // The map is built from Namespace::ALL, so every namespace is present.
        &self.topics[&namespace]
    }

    /// Publishes an event onto its namespace partition.
    pub async fn publish(&self, event: StreamEvent) {
        let namespace = event.namespace();
        let topic = self.topic(namespace);

        let len = {
            let mut log = topic.log.write().await;
            tracing::debug!(
                namespace = %namespace,
                event_type = event.event_type(),
                event_id = %event.event_id,
                organization = %event.organization,
                "event published"
            );
            log.push(event);
            log.len()
        };

        metrics::counter!("fabric_events_published_total", "namespace" => namespace.as_str())
            .increment(1);
        topic.len_tx.send_replace(len);
    }

    /// Subscribes to a namespace from the beginning of its log.
    pub fn subscribe(&self, namespace: Namespace) -> EventStream {
        self.subscribe_from(namespace, 0)
    }

    /// Subscribes to a namespace starting at `offset`.
    ///
    /// Replays everything already in the log from `offset`, then follows
    /// live publishes.
    pub fn subscribe_from(&self, namespace: Namespace, offset: usize) -> EventStream {
        let topic = Arc::clone(self.topic(namespace));

        let stream = futures_util::stream::unfold((topic, offset), |(topic, next)| async move {
            loop {
                let hit = {
                    let log = topic.log.read().await;
                    if next < log.len() {
                        Some(log[next].clone())
                    } else {
                        None
                    }
                };

                if let Some(event) = hit {
                    return Some(((next, event), (topic, next + 1)));
                }

                let mut len_rx = topic.len_tx.subscribe();
                if *len_rx.borrow() > next {
                    continue;
                }
                if len_rx.changed().await.is_err() {
                    return None;
                }
            }
        });

        Box::pin(stream)
    }

    /// Returns the number of events published to a namespace so far.
    pub async fn len(&self, namespace: Namespace) -> usize {
        self.topic(namespace).log.read().await.len()
    }

    /// Returns true when no events have been published to a namespace.
    pub async fn is_empty(&self, namespace: Namespace) -> bool {
        self.len(namespace).await == 0
    }

    /// Returns a copy of a namespace's log. Intended for tests and
    /// diagnostics, not hot paths.
    pub async fn events_in(&self, namespace: Namespace) -> Vec<StreamEvent> {
        self.topic(namespace).log.read().await.clone()
    }
}

impl Default for EventFabric {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EventPayload, EventSource};
    use crate::events::InventoryEvent;
    use common::{EntityId, TenantId};
    use futures_util::StreamExt;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn stock_event(tenant: TenantId, source_entity: EntityId, remaining: Decimal) -> StreamEvent {
        StreamEvent::new(
            tenant,
            EventSource::new("inventory", source_entity),
            EventPayload::Inventory(InventoryEvent::stock_consumed(
                EntityId::new(),
                dec!(1),
                remaining,
            )),
        )
    }

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let fabric = EventFabric::new();
        let tenant = TenantId::new();
        let source = EntityId::new();

        for i in 0..5 {
            fabric
                .publish(stock_event(tenant, source, Decimal::from(i)))
                .await;
        }

        let mut stream = fabric.subscribe(Namespace::Inventory);
        for i in 0..5 {
            let (offset, event) = stream.next().await.unwrap();
            assert_eq!(offset, i);
            if let EventPayload::Inventory(InventoryEvent::StockConsumed(data)) = event.payload {
                assert_eq!(data.remaining, Decimal::from(i));
            } else {
                panic!("expected StockConsumed");
            }
        }
    }

    #[tokio::test]
    async fn subscriber_sees_live_publishes() {
        let fabric = EventFabric::new();
        let tenant = TenantId::new();
        let source = EntityId::new();

        let mut stream = fabric.subscribe(Namespace::Inventory);

        let publisher = {
            let fabric = fabric.clone();
            tokio::spawn(async move {
                fabric.publish(stock_event(tenant, source, dec!(9))).await;
            })
        };

        let (offset, event) = stream.next().await.unwrap();
        assert_eq!(offset, 0);
        assert_eq!(event.namespace(), Namespace::Inventory);
        publisher.await.unwrap();
    }

    #[tokio::test]
    async fn restart_from_offset_skips_acknowledged() {
        let fabric = EventFabric::new();
        let tenant = TenantId::new();
        let source = EntityId::new();

        for i in 0..4 {
            fabric
                .publish(stock_event(tenant, source, Decimal::from(i)))
                .await;
        }

        let mut stream = fabric.subscribe_from(Namespace::Inventory, 2);
        let (offset, _) = stream.next().await.unwrap();
        assert_eq!(offset, 2);
        let (offset, _) = stream.next().await.unwrap();
        assert_eq!(offset, 3);
    }

    #[tokio::test]
    async fn namespaces_are_independent() {
        let fabric = EventFabric::new();
        let tenant = TenantId::new();

        fabric
            .publish(stock_event(tenant, EntityId::new(), dec!(3)))
            .await;

        assert_eq!(fabric.len(Namespace::Inventory).await, 1);
        assert!(fabric.is_empty(Namespace::Order).await);
        assert!(fabric.is_empty(Namespace::Alert).await);
    }

    #[tokio::test]
    async fn two_subscribers_both_see_everything() {
        let fabric = EventFabric::new();
        let tenant = TenantId::new();
        let source = EntityId::new();

        let mut first = fabric.subscribe(Namespace::Inventory);
        let mut second = fabric.subscribe(Namespace::Inventory);

        fabric.publish(stock_event(tenant, source, dec!(1))).await;
        fabric.publish(stock_event(tenant, source, dec!(2))).await;

        for stream in [&mut first, &mut second] {
            let (o1, _) = stream.next().await.unwrap();
            let (o2, _) = stream.next().await.unwrap();
            assert_eq!((o1, o2), (0, 1));
        }
    }
}
