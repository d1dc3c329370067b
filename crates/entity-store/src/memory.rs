use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ActorKey;
use tokio::sync::RwLock;

use crate::state::{StateEnvelope, Version};
use crate::store::EntityStore;
use crate::{EntityStoreError, Result};

/// In-memory entity store implementation for testing.
///
/// This implementation keeps all envelopes in memory and provides the same
/// interface and conflict semantics as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    entries: Arc<RwLock<HashMap<ActorKey, StateEnvelope>>>,
}

impl InMemoryEntityStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys with persisted state.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Clears all persisted state.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn load(&self, key: &ActorKey) -> Result<Option<StateEnvelope>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(
        &self,
        key: &ActorKey,
        envelope: StateEnvelope,
        expected: Version,
    ) -> Result<Version> {
        let mut entries = self.entries.write().await;

        let actual = entries
            .get(key)
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        if actual != expected {
            metrics::counter!("entity_store_conflicts_total").increment(1);
            return Err(EntityStoreError::VersionConflict {
                key: key.to_string(),
                expected,
                actual,
            });
        }

        let version = envelope.version;
        entries.insert(*key, envelope);
        Ok(version)
    }

    async fn current_version(&self, key: &ActorKey) -> Result<Option<Version>> {
        Ok(self.entries.read().await.get(key).map(|e| e.version))
    }
}
