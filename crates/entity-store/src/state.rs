use chrono::{DateTime, Utc};
use common::EventId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Version number for an actor's persisted state, used for optimistic
/// concurrency control.
///
/// Versions start at 1 for the first write and increment by 1 with each
/// subsequent write of the same key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a key that has never been written.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) for the first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Persisted envelope around an actor's state.
///
/// The envelope is owned exclusively by its actor: no other component
/// mutates it directly, and every write goes through the compare-and-swap
/// in [`crate::EntityStore::save`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Monotonic version, checked on every save.
    pub version: Version,

    /// The actor's state, serialized as JSON.
    pub payload: serde_json::Value,

    /// Identifier of the last fabric event this actor applied, for
    /// idempotent re-application under at-least-once delivery.
    pub last_applied_event_id: Option<EventId>,

    /// When the envelope was last written.
    pub updated_at: DateTime<Utc>,
}

impl StateEnvelope {
    /// Serializes `state` into an envelope at the given version.
    pub fn encode<T: Serialize>(
        state: &T,
        version: Version,
        last_applied_event_id: Option<EventId>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            version,
            payload: serde_json::to_value(state)?,
            last_applied_event_id,
            updated_at: Utc::now(),
        })
    }

    /// Deserializes the payload back into a typed state.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
