use async_trait::async_trait;
use common::ActorKey;

use crate::state::{StateEnvelope, Version};
use crate::Result;

/// Core trait for entity store implementations.
///
/// An entity store persists one [`StateEnvelope`] per actor key and
/// enforces optimistic concurrency on writes. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Loads the current envelope for a key.
    ///
    /// Returns `None` for a key that has never been written.
    async fn load(&self, key: &ActorKey) -> Result<Option<StateEnvelope>>;

    /// Saves an envelope, conditioned on the currently stored version.
    ///
    /// The write succeeds only when the stored version (or
    /// [`Version::initial`] for an absent key) equals `expected`; otherwise
    /// it fails with `VersionConflict` and leaves the stored state
    /// untouched. Returns the version that was written.
    async fn save(
        &self,
        key: &ActorKey,
        envelope: StateEnvelope,
        expected: Version,
    ) -> Result<Version>;

    /// Returns the current version of a key, or `None` if absent.
    async fn current_version(&self, key: &ActorKey) -> Result<Option<Version>>;
}
