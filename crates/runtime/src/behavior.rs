//! The actor behavior contract.

use common::{ActorKey, EventId};
use fabric::StreamEvent;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ErrorCode;

/// Context handed to a behavior alongside each command.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    /// The key the command was dispatched to. The entity portion doubles as
    /// the domain identity (customer ID for loyalty, recipe ID for costing).
    pub key: ActorKey,

    /// The last fabric event this actor applied, from the persisted
    /// envelope. Behaviors driven by event chains use this to skip
    /// re-deliveries.
    pub last_applied_event: Option<EventId>,
}

/// The outcome of a handled command: the complete next state, the caller's
/// response, and the events to publish once the state is persisted.
pub struct Applied<B: ActorBehavior> {
    /// The full next state. The runtime persists this atomically; the
    /// behavior never mutates in place.
    pub state: B,

    /// Response returned to the dispatcher.
    pub response: B::Response,

    /// Events published after a successful persist, in order.
    pub events: Vec<StreamEvent>,

    /// The fabric event this command was derived from, recorded into the
    /// envelope for idempotent re-application.
    pub source_event: Option<EventId>,

    /// Whether the state changed. Read-only commands skip the persist (and
    /// the version bump) entirely.
    pub mutated: bool,
}

impl<B: ActorBehavior> Applied<B> {
    /// A mutating outcome with no events.
    pub fn new(state: B, response: B::Response) -> Self {
        Self {
            state,
            response,
            events: Vec::new(),
            source_event: None,
            mutated: true,
        }
    }

    /// A read-only outcome: the runtime replies without persisting.
    pub fn read_only(state: B, response: B::Response) -> Self {
        Self {
            state,
            response,
            events: Vec::new(),
            source_event: None,
            mutated: false,
        }
    }

    /// Attaches events to publish after the persist.
    pub fn with_events(mut self, events: Vec<StreamEvent>) -> Self {
        self.events = events;
        self
    }

    /// Records the fabric event that produced this command.
    pub fn from_event(mut self, event_id: Option<EventId>) -> Self {
        self.source_event = event_id;
        self
    }
}

/// A single-writer stateful entity addressed by a stable key.
///
/// A behavior is a pure decision function over its own state: it inspects
/// the current state and a command and returns the complete next state plus
/// the events to emit. The runtime owns every suspension point (entity
/// store, fabric), which keeps handlers all-or-nothing: a returned error
/// leaves the persisted state untouched, and no partial mutation is ever
/// observable.
pub trait ActorBehavior:
    Default + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Commands this actor accepts.
    type Command: Clone + Send + 'static;

    /// Response returned to dispatchers.
    type Response: Send + 'static;

    /// Domain error type; returned as a typed result, never thrown across
    /// the actor boundary.
    type Error: std::error::Error + ErrorCode + Send + Sync + 'static;

    /// Static actor type name; part of the [`ActorKey`].
    fn actor_type() -> &'static str;

    /// Decides the outcome of a command against the current state.
    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error>;
}
