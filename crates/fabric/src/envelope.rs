use chrono::{DateTime, Utc};
use common::{EntityId, EventId, TenantId};
use serde::{Deserialize, Serialize};

use crate::events::{
    AccountingEvent, AlertEvent, BookingDepositEvent, CustomerSpendEvent, EmployeeEvent,
    GiftCardEvent, InventoryEvent, OrderEvent, SalesEvent, UserEvent,
};
use crate::namespace::Namespace;

/// The actor (or reactor) that published an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    /// Publisher's actor type (e.g. `"recipe"`, `"inventory"`).
    pub actor_type: String,

    /// Publisher's entity ID; duplicate filtering is keyed by this.
    pub entity: EntityId,
}

impl EventSource {
    /// Creates a new event source reference.
    pub fn new(actor_type: impl Into<String>, entity: EntityId) -> Self {
        Self {
            actor_type: actor_type.into(),
            entity,
        }
    }
}

/// One namespace's worth of event, as a closed tagged union.
///
/// Subscribers match exhaustively on the inner enum; adding a variant is a
/// compile error in every consumer rather than a silently ignored payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "namespace", content = "event", rename_all = "snake_case")]
pub enum EventPayload {
    User(UserEvent),
    Employee(EmployeeEvent),
    Order(OrderEvent),
    Inventory(InventoryEvent),
    Sales(SalesEvent),
    Alert(AlertEvent),
    BookingDeposit(BookingDepositEvent),
    GiftCard(GiftCardEvent),
    CustomerSpend(CustomerSpendEvent),
    Accounting(AccountingEvent),
}

impl EventPayload {
    /// Returns the namespace this payload belongs to.
    pub fn namespace(&self) -> Namespace {
        match self {
            EventPayload::User(_) => Namespace::User,
            EventPayload::Employee(_) => Namespace::Employee,
            EventPayload::Order(_) => Namespace::Order,
            EventPayload::Inventory(_) => Namespace::Inventory,
            EventPayload::Sales(_) => Namespace::Sales,
            EventPayload::Alert(_) => Namespace::Alert,
            EventPayload::BookingDeposit(_) => Namespace::BookingDeposit,
            EventPayload::GiftCard(_) => Namespace::GiftCard,
            EventPayload::CustomerSpend(_) => Namespace::CustomerSpend,
            EventPayload::Accounting(_) => Namespace::Accounting,
        }
    }

    /// Returns the event type name of the inner variant.
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::User(e) => e.event_type(),
            EventPayload::Employee(e) => e.event_type(),
            EventPayload::Order(e) => e.event_type(),
            EventPayload::Inventory(e) => e.event_type(),
            EventPayload::Sales(e) => e.event_type(),
            EventPayload::Alert(e) => e.event_type(),
            EventPayload::BookingDeposit(e) => e.event_type(),
            EventPayload::GiftCard(e) => e.event_type(),
            EventPayload::CustomerSpend(e) => e.event_type(),
            EventPayload::Accounting(e) => e.event_type(),
        }
    }
}

/// An event on the fabric: an immutable fact published after a committed
/// state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// When the fact occurred.
    pub occurred_at: DateTime<Utc>,

    /// The tenant (organization) partition this event belongs to.
    pub organization: TenantId,

    /// Who published the event.
    pub source: EventSource,

    /// The namespaced fact itself.
    pub payload: EventPayload,
}

impl StreamEvent {
    /// Creates a new event with a fresh ID, stamped now.
    pub fn new(organization: TenantId, source: EventSource, payload: EventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            organization,
            source,
            payload,
        }
    }

    /// Returns the namespace the event is published on.
    pub fn namespace(&self) -> Namespace {
        self.payload.namespace()
    }

    /// Returns the event type name (e.g. `"OrderCompleted"`).
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AlertEvent;
    use rust_decimal_macros::dec;

    #[test]
    fn payload_maps_to_namespace() {
        let payload = EventPayload::Alert(AlertEvent::low_stock(
            EntityId::new(),
            dec!(2),
            dec!(5),
        ));
        assert_eq!(payload.namespace(), Namespace::Alert);
        assert_eq!(payload.event_type(), "LowStock");
    }

    #[test]
    fn stream_event_roundtrip() {
        let event = StreamEvent::new(
            TenantId::new(),
            EventSource::new("inventory", EntityId::new()),
            EventPayload::Inventory(crate::events::InventoryEvent::stock_consumed(
                EntityId::new(),
                dec!(2),
                dec!(8),
            )),
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_id, event.event_id);
        assert_eq!(back.namespace(), Namespace::Inventory);
        assert_eq!(back.event_type(), "StockConsumed");
    }

    #[test]
    fn unique_event_ids() {
        let tenant = TenantId::new();
        let source = EventSource::new("recipe", EntityId::new());
        let a = StreamEvent::new(
            tenant,
            source.clone(),
            EventPayload::Alert(AlertEvent::low_stock(EntityId::new(), dec!(1), dec!(5))),
        );
        let b = StreamEvent::new(
            tenant,
            source,
            EventPayload::Alert(AlertEvent::low_stock(EntityId::new(), dec!(1), dec!(5))),
        );
        assert_ne!(a.event_id, b.event_id);
    }
}
