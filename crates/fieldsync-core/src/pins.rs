//! Explicit "keep available offline" flagging, independent of the write queue.

use serde_json::Value;

use crate::models::PinnedEntity;
use crate::store::LocalStore;
use crate::Result;

/// CRUD over pinned entities.
#[derive(Clone)]
pub struct PinManager {
    store: LocalStore,
}

impl PinManager {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Pin an entity, overwriting any existing pin and resetting both timestamps.
    pub async fn pin(&self, entity_id: &str, snapshot: Option<Value>) -> Result<PinnedEntity> {
        let pin = PinnedEntity::new(entity_id, snapshot);
        self.store.put_pin(&pin).await?;
        tracing::debug!("Pinned {entity_id}");
        Ok(pin)
    }

    /// Remove a pin. Unpinning an absent entity is not an error.
    pub async fn unpin(&self, entity_id: &str) -> Result<()> {
        if self.store.delete_pin(entity_id).await? {
            tracing::debug!("Unpinned {entity_id}");
        }
        Ok(())
    }

    /// Whether the entity is pinned; storage errors read as "not pinned".
    pub async fn is_pinned(&self, entity_id: &str) -> bool {
        match self.try_is_pinned(entity_id).await {
            Ok(pinned) => pinned,
            Err(error) => {
                tracing::warn!("Pin lookup for {entity_id} failed, treating as unpinned: {error}");
                false
            }
        }
    }

    pub async fn try_is_pinned(&self, entity_id: &str) -> Result<bool> {
        Ok(self.store.get_pin(entity_id).await?.is_some())
    }

    /// Stored snapshot for offline rendering.
    pub async fn get(&self, entity_id: &str) -> Result<Option<PinnedEntity>> {
        self.store.get_pin(entity_id).await
    }

    /// Every pin, most recently updated first.
    pub async fn all_pinned(&self) -> Result<Vec<PinnedEntity>> {
        self.store.pins().await
    }
}
