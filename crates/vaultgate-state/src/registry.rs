use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, RwLock},
};

use thiserror::Error;

use crate::repository::{Repository, RepositoryItem};

/// A registry that contains the repositories the embedding application provides for the
/// protocol's entity types. The server resolves its repositories from the registry once,
/// at construction, and fails fast when one is missing.
pub struct StateRegistry {
    repositories: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRegistry").finish()
    }
}

/// No repository was registered for a required entity type.
#[derive(Debug, Error)]
#[error("Repository for type {0} is not registered")]
pub struct RepositoryNotFoundError(pub &'static str);

impl StateRegistry {
    /// Creates a new empty `StateRegistry`.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        StateRegistry {
            repositories: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a repository into the map, associating it with its item type.
    /// Registering the same type twice replaces the earlier repository.
    pub fn register<T: RepositoryItem>(&self, value: Arc<dyn Repository<T>>) {
        self.repositories
            .write()
            .expect("RwLock should not be poisoned")
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a repository from the map given its item type.
    pub fn get<T: RepositoryItem>(&self) -> Option<Arc<dyn Repository<T>>> {
        self.repositories
            .read()
            .expect("RwLock should not be poisoned")
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<dyn Repository<T>>>())
            .map(Arc::clone)
    }

    /// Retrieves a repository, reporting a missing registration as an error.
    pub fn get_required<T: RepositoryItem>(
        &self,
    ) -> Result<Arc<dyn Repository<T>>, RepositoryNotFoundError> {
        self.get::<T>().ok_or_else(|| {
            log::error!("Repository for type {} is not registered", T::NAME);
            RepositoryNotFoundError(T::NAME)
        })
    }
}
