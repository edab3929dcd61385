use std::{collections::HashMap, sync::Mutex};

use vaultgate_state::{Repository, RepositoryError, RepositoryItem};

/// An in-memory repository over JSON-serialized rows.
///
/// Rows are stored serialized so the fixture exercises the same serde path a
/// persistent backend would. All operations, including the compare and swap in
/// [`replace`](Repository::replace), run under a single mutex and are atomic
/// with respect to each other.
pub struct MemoryRepository<T: RepositoryItem> {
    store: Mutex<HashMap<String, String>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: RepositoryItem> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T: RepositoryItem> Repository<T> for MemoryRepository<T> {
    async fn get(&self, key: String) -> Result<Option<T>, RepositoryError> {
        let store = self.store.lock().expect("Mutex should not be poisoned");
        store
            .get(&key)
            .map(|value| serde_json::from_str(value))
            .transpose()
            .map_err(Into::into)
    }

    async fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let store = self.store.lock().expect("Mutex should not be poisoned");
        store
            .values()
            .map(|value| serde_json::from_str(value))
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn set(&self, key: String, value: T) -> Result<(), RepositoryError> {
        let serialized = serde_json::to_string(&value)?;
        let mut store = self.store.lock().expect("Mutex should not be poisoned");
        store.insert(key, serialized);
        Ok(())
    }

    async fn remove(&self, key: String) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().expect("Mutex should not be poisoned");
        store.remove(&key);
        Ok(())
    }

    async fn replace(
        &self,
        key: String,
        expected_revision: u64,
        value: T,
    ) -> Result<bool, RepositoryError> {
        let serialized = serde_json::to_string(&value)?;
        let mut store = self.store.lock().expect("Mutex should not be poisoned");
        let Some(current) = store.get(&key) else {
            return Ok(false);
        };
        let current: T = serde_json::from_str(current)?;
        if current.revision() != expected_revision {
            return Ok(false);
        }
        store.insert(key, serialized);
        Ok(true)
    }
}
