use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::value_objects::EntityId;

/// An aggregate root that edit sessions operate on.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Top-level fields the server rewrites on every write (timestamps).
    /// They are never reported as concurrent changes.
    const VOLATILE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &EntityId;
    fn set_id(&mut self, id: EntityId);
}

/// The page's in-memory copy of an entity, shared between every edit session
/// opened on it.
///
/// Cloning the view clones the handle, not the entity. The lock is only held
/// while copying in or out, never across an await.
#[derive(Debug)]
pub struct EntityView<E> {
    inner: Arc<Mutex<E>>,
}

impl<E> Clone for EntityView<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> EntityView<E> {
    pub fn new(entity: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(entity)),
        }
    }

    /// Returns a copy of the current entity.
    pub fn get(&self) -> E {
        self.lock().clone()
    }

    pub fn id(&self) -> EntityId {
        self.lock().id().clone()
    }

    /// Replaces the entity, returning the previous value.
    pub fn replace(&self, entity: E) -> E {
        std::mem::replace(&mut *self.lock(), entity)
    }

    /// Mutates the entity in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, E> {
        // Writers always leave a complete value behind; poison is ignored.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
