use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::changes::merge_partial;
use crate::domain::entity::Entity;
use crate::domain::ports::{DraftStore, EntityRepository};
use crate::domain::value_objects::{EntityId, DRAFT_PREFIX};

/// Generate a fresh local id for a draft.
pub fn new_draft_id() -> EntityId {
    EntityId(format!("{}{}", DRAFT_PREFIX, Uuid::new_v4().simple()))
}

// ─────────────────────────────────────────────────────────────────────────────
// DraftService
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of listings that have not reached the server yet.
///
/// A draft is created by [`start_from_scratch`](Self::start_from_scratch),
/// edited through [`DraftRepository`] like any listing, and destroyed either
/// by [`publish`](Self::publish) once the server has assigned a real id, or by
/// [`discard`](Self::discard).
pub struct DraftService<E: Entity> {
    store: Arc<dyn DraftStore<E>>,
    server: Arc<dyn EntityRepository<E>>,
}

impl<E: Entity> DraftService<E> {
    pub fn new(store: Arc<dyn DraftStore<E>>, server: Arc<dyn EntityRepository<E>>) -> Self {
        Self { store, server }
    }

    /// Create and store an empty draft.
    pub async fn start_from_scratch(&self) -> Result<E>
    where
        E: Default,
    {
        let id = new_draft_id();
        let mut draft = E::default();
        draft.set_id(id.clone());
        self.store.put(&id, &draft).await?;
        info!(draft.id = %id, "draft created");
        Ok(draft)
    }

    pub async fn get(&self, id: &EntityId) -> Result<Option<E>> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<EntityId>> {
        self.store.list().await
    }

    /// Send the draft to the server. The draft is removed only once the
    /// server has created the listing; on failure it is kept for a retry.
    #[instrument(name = "publish_draft", skip(self), fields(draft.id = %id), level = "info")]
    pub async fn publish(&self, id: &EntityId) -> Result<E> {
        let mut draft = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("Draft {} not found", id))?;
        draft.set_id(EntityId::default());

        let created = match self.server.create(&draft).await {
            Ok(created) => created,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "publishing draft failed, draft kept");
                return Err(err.context(format!("Failed to publish draft {}", id)));
            }
        };

        self.store.remove(id).await?;
        info!(listing.id = %created.id(), "draft published");
        Ok(created)
    }

    pub async fn discard(&self, id: &EntityId) -> Result<()> {
        self.store.remove(id).await?;
        debug!(draft.id = %id, "draft discarded");
        Ok(())
    }

    /// A repository that edits drafts in place, for use with an
    /// `EditSessionController`.
    pub fn repository(&self) -> DraftRepository<E> {
        DraftRepository::new(Arc::clone(&self.store))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DraftRepository
// ─────────────────────────────────────────────────────────────────────────────

/// [`EntityRepository`] over a [`DraftStore`]: updates merge into the stored
/// draft instead of going to the server.
pub struct DraftRepository<E: Entity> {
    store: Arc<dyn DraftStore<E>>,
}

impl<E: Entity> DraftRepository<E> {
    pub fn new(store: Arc<dyn DraftStore<E>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<E: Entity> EntityRepository<E> for DraftRepository<E> {
    async fn get(&self, id: &EntityId) -> Result<E> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("Draft {} not found", id))
    }

    async fn create(&self, entity: &E) -> Result<E> {
        let id = new_draft_id();
        let mut draft = entity.clone();
        draft.set_id(id.clone());
        self.store.put(&id, &draft).await?;
        Ok(draft)
    }

    async fn update(&self, id: &EntityId, partial: &Value, cancel: &CancellationToken) -> Result<E> {
        let current = self.get(id).await?;
        if cancel.is_cancelled() {
            bail!("update of draft {} cancelled", id);
        }

        let mut merged = serde_json::to_value(&current)?;
        merge_partial(&mut merged, partial);
        let updated: E = serde_json::from_value(merged)
            .with_context(|| format!("Partial update does not fit draft {}", id))?;

        self.store.put(id, &updated).await?;
        Ok(updated)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
