use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::domain::entity::Entity;
use crate::domain::value_objects::{EntityId, FieldErrors};

/// Port: server-side persistence of entities (implemented by
/// `HttpListingRepository`).
#[async_trait]
pub trait EntityRepository<E: Entity>: Send + Sync {
    async fn get(&self, id: &EntityId) -> Result<E>;

    /// Create a new entity; the returned value carries the server-assigned id.
    async fn create(&self, entity: &E) -> Result<E>;

    /// Apply a partial update and return the authoritative entity.
    ///
    /// Implementations should stop work and fail once `cancel` fires.
    async fn update(&self, id: &EntityId, partial: &Value, cancel: &CancellationToken)
        -> Result<E>;
}

/// Port: user-visible toasts. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_error(&self, message: &str);
}

/// Port: synchronous validation of a working copy before it is saved.
pub trait Validator<G>: Send + Sync {
    fn validate(&self, working: &G) -> FieldErrors;
}

impl<G, F> Validator<G> for F
where
    F: Fn(&G) -> FieldErrors + Send + Sync,
{
    fn validate(&self, working: &G) -> FieldErrors {
        self(working)
    }
}

/// Port: local storage of unsaved drafts (implemented by `MemoryDraftStore`
/// and `SqlDraftStore`).
#[async_trait]
pub trait DraftStore<E: Entity>: Send + Sync {
    async fn get(&self, id: &EntityId) -> Result<Option<E>>;
    async fn put(&self, id: &EntityId, entity: &E) -> Result<()>;
    async fn remove(&self, id: &EntityId) -> Result<()>;
    async fn list(&self) -> Result<Vec<EntityId>>;
}

/// Port: bearer tokens for the listings API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The token to attach to the next request.
    async fn token(&self) -> Result<String>;

    /// Obtain a fresh token after the server rejected the current one.
    async fn refresh(&self) -> Result<String>;
}
