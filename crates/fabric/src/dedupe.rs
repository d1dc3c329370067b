//! Idempotent re-application support for at-least-once delivery.

use std::collections::HashMap;

use common::{EntityId, EventId};
use serde::{Deserialize, Serialize};

use crate::envelope::StreamEvent;

/// Tracks the last applied event ID per source actor.
///
/// Under at-least-once delivery the same event can arrive more than once;
/// a consumer calls [`DuplicateFilter::observe`] before applying and skips
/// anything already seen. The filter is keyed per source entity, so
/// interleaved events from different sources never shadow each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateFilter {
    last_applied: HashMap<EntityId, EventId>,
}

impl DuplicateFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event and reports whether it is fresh.
    ///
    /// Returns `false` when the event is the same one most recently applied
    /// from its source (a re-delivery); returns `true` and remembers it
    /// otherwise.
    pub fn observe(&mut self, event: &StreamEvent) -> bool {
        match self.last_applied.get(&event.source.entity) {
            Some(last) if *last == event.event_id => false,
            _ => {
                self.last_applied.insert(event.source.entity, event.event_id);
                true
            }
        }
    }

    /// Returns the last applied event ID for a source, if any.
    pub fn last_for(&self, source: EntityId) -> Option<EventId> {
        self.last_applied.get(&source).copied()
    }
}
