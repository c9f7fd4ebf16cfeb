//! Shared test fixtures.

use patron_storage::{CredentialStore, SecureStorage, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory storage for testing.
pub(crate) struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub(crate) fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl SecureStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }
}

pub(crate) fn memory_backend() -> Arc<dyn SecureStorage> {
    Arc::new(MemoryStorage::new())
}

pub(crate) fn memory_store(library_uuid: &str) -> CredentialStore {
    CredentialStore::new(memory_backend(), library_uuid)
}
