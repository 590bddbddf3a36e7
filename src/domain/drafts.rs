use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::domain::entity::Entity;
use crate::domain::ports::DraftStore;
use crate::domain::value_objects::EntityId;

/// In-memory implementation of [`DraftStore`].
///
/// Drafts live as long as the store. Use `SqlDraftStore` to keep them across
/// restarts.
pub struct MemoryDraftStore<E>(Mutex<BTreeMap<EntityId, E>>);

impl<E> MemoryDraftStore<E> {
    pub fn new() -> Self {
        Self(Mutex::new(BTreeMap::new()))
    }
}

impl<E> Default for MemoryDraftStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> DraftStore<E> for MemoryDraftStore<E> {
    async fn get(&self, id: &EntityId) -> Result<Option<E>> {
        Ok(self.lock().get(id).cloned())
    }

    async fn put(&self, id: &EntityId, entity: &E) -> Result<()> {
        self.lock().insert(id.clone(), entity.clone());
        Ok(())
    }

    async fn remove(&self, id: &EntityId) -> Result<()> {
        self.lock().remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EntityId>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

impl<E> MemoryDraftStore<E> {
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<EntityId, E>> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
