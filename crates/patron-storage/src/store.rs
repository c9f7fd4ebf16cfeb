//! Transactional, library-namespaced credential store.
//!
//! `CredentialStore` layers three things over a raw [`SecureStorage`] backend:
//!
//! - **Namespacing**: every logical key is scoped to a library uuid
//!   (see [`crate::scoped_key`]); `rekey` switches the namespace in place.
//! - **Caching**: values are cached after first read. The cache is updated
//!   synchronously on write, so a read immediately after a write returns the
//!   just-written value even before the backend flush lands.
//! - **Transactions**: a reentrant lock groups related multi-field writes so
//!   a concurrent reader never observes half of a logically-related update.
//!
//! Backend writes are fire-and-forget: they run on a dedicated writer thread
//! and failures are logged, never surfaced to the caller.

use crate::{scoped_key, SecureStorage};
use parking_lot::ReentrantMutex;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

enum FlushOp {
    Set(String, String),
    Delete(String),
    Barrier(Sender<()>),
}

struct StoreState {
    library_uuid: String,
    generation: u64,
    cache: HashMap<String, Option<String>>,
    flush_tx: Sender<FlushOp>,
}

/// Cached, lock-guarded key-value store scoped to one library's namespace.
pub struct CredentialStore {
    backend: Arc<dyn SecureStorage>,
    state: Mutex<StoreState>,
    txn: ReentrantMutex<()>,
}

impl CredentialStore {
    /// Create a store over `backend`, scoped to `library_uuid`.
    pub fn new(backend: Arc<dyn SecureStorage>, library_uuid: &str) -> Self {
        let (flush_tx, flush_rx) = mpsc::channel();
        spawn_writer(backend.clone(), flush_rx);

        Self {
            backend,
            state: Mutex::new(StoreState {
                library_uuid: library_uuid.to_string(),
                generation: 0,
                cache: HashMap::new(),
                flush_tx,
            }),
            txn: ReentrantMutex::new(()),
        }
    }

    /// The library uuid this store is currently scoped to.
    pub fn library_uuid(&self) -> String {
        self.state.lock().expect("store state lock poisoned").library_uuid.clone()
    }

    /// Cache generation; bumped on every `rekey`.
    pub fn generation(&self) -> u64 {
        self.state.lock().expect("store state lock poisoned").generation
    }

    /// Run `f` with the transaction lock held, grouping its reads and writes.
    ///
    /// The lock is reentrant: reads and writes inside `f` take it again
    /// without deadlocking, and transactions may nest.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.txn.lock();
        f()
    }

    /// Read a logical key. Missing keys and backend failures both read as `None`.
    pub fn read(&self, logical: &str) -> Option<String> {
        let _guard = self.txn.lock();
        let mut state = self.state.lock().expect("store state lock poisoned");
        let key = scoped_key(logical, &state.library_uuid);

        if let Some(cached) = state.cache.get(&key) {
            return cached.clone();
        }

        let value = match self.backend.get(&key) {
            Ok(v) => v,
            Err(e) => {
                debug!(key = %key, error = %e, "Backend read failed, treating as absent");
                None
            }
        };
        state.cache.insert(key, value.clone());
        value
    }

    /// Write a logical key; `None` deletes. The cache is updated synchronously
    /// and the backend write is queued to the writer thread.
    pub fn write(&self, logical: &str, value: Option<&str>) {
        let _guard = self.txn.lock();
        let mut state = self.state.lock().expect("store state lock poisoned");
        let key = scoped_key(logical, &state.library_uuid);

        state.cache.insert(key.clone(), value.map(String::from));

        let op = match value {
            Some(v) => FlushOp::Set(key, v.to_string()),
            None => FlushOp::Delete(key),
        };
        if state.flush_tx.send(op).is_err() {
            warn!("Flush worker is gone; write retained in cache only");
        }
    }

    /// Read a JSON-encoded value. Decode failures read as `None`.
    pub fn read_json<T: DeserializeOwned>(&self, logical: &str) -> Option<T> {
        let raw = self.read(logical)?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(key = %logical, error = %e, "Stored value failed to decode");
                None
            }
        }
    }

    /// Write a JSON-encoded value; `None` deletes.
    pub fn write_json<T: Serialize>(&self, logical: &str, value: Option<&T>) {
        match value {
            Some(v) => match serde_json::to_string(v) {
                Ok(json) => self.write(logical, Some(&json)),
                Err(e) => warn!(key = %logical, error = %e, "Value failed to encode, not written"),
            },
            None => self.write(logical, None),
        }
    }

    /// Read a boolean flag; absent or unparsable reads as `false`.
    pub fn read_flag(&self, logical: &str) -> bool {
        self.read(logical)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// Write a boolean flag.
    pub fn write_flag(&self, logical: &str, value: bool) {
        self.write(logical, Some(if value { "true" } else { "false" }));
    }

    /// Switch the store to a different library's namespace.
    ///
    /// Bumps the generation and drops the whole cache so no value read under
    /// the previous namespace can be served for the new one.
    pub fn rekey(&self, library_uuid: &str) {
        let _guard = self.txn.lock();
        let mut state = self.state.lock().expect("store state lock poisoned");
        if state.library_uuid == library_uuid {
            return;
        }
        debug!(
            from = %state.library_uuid,
            to = %library_uuid,
            "Rekeying credential store"
        );
        state.library_uuid = library_uuid.to_string();
        state.generation += 1;
        state.cache.clear();
    }

    /// Wait for every queued backend write to land.
    ///
    /// Reads never need this (the cache is authoritative); it exists for
    /// tests and orderly shutdown.
    pub fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        {
            let state = self.state.lock().expect("store state lock poisoned");
            if state.flush_tx.send(FlushOp::Barrier(tx)).is_err() {
                return;
            }
        }
        let _ = rx.recv();
    }
}

fn spawn_writer(backend: Arc<dyn SecureStorage>, rx: Receiver<FlushOp>) {
    let builder = std::thread::Builder::new().name("credential-flush".to_string());
    let spawned = builder.spawn(move || {
        while let Ok(op) = rx.recv() {
            match op {
                FlushOp::Set(key, value) => {
                    if let Err(e) = backend.set(&key, &value) {
                        warn!(key = %key, error = %e, "Failed to flush write to secure storage");
                    }
                }
                FlushOp::Delete(key) => {
                    if let Err(e) = backend.delete(&key) {
                        warn!(key = %key, error = %e, "Failed to flush delete to secure storage");
                    }
                }
                FlushOp::Barrier(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    });
    if let Err(e) = spawned {
        warn!(error = %e, "Failed to spawn credential flush worker");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StorageResult, DEFAULT_LIBRARY_UUID};

    struct MemoryStorage {
        data: Mutex<HashMap<String, String>>,
    }

    impl MemoryStorage {
        fn new() -> Self {
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

    /// Storage whose writes always fail, for fire-and-forget semantics.
    struct BrokenStorage;

    impl SecureStorage for BrokenStorage {
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(crate::StorageError::Platform("write refused".to_string()))
        }

        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn delete(&self, _key: &str) -> StorageResult<bool> {
            Err(crate::StorageError::Platform("delete refused".to_string()))
        }
    }

    fn store_for(library: &str) -> (Arc<MemoryStorage>, CredentialStore) {
        let backend = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(backend.clone(), library);
        (backend, store)
    }

    #[test]
    fn test_read_after_write_before_flush() {
        let (_backend, store) = store_for("urn:uuid:lib-a");

        store.write("credentials", Some("v1"));
        assert_eq!(store.read("credentials"), Some("v1".to_string()));
    }

    #[test]
    fn test_write_reaches_backend_after_flush() {
        let (backend, store) = store_for("urn:uuid:lib-a");

        store.write("credentials", Some("v1"));
        store.flush();

        assert_eq!(
            backend.get("credentials_urn:uuid:lib-a").unwrap(),
            Some("v1".to_string())
        );
    }

    #[test]
    fn test_default_library_uses_bare_keys() {
        let (backend, store) = store_for(DEFAULT_LIBRARY_UUID);

        store.write("barcode", Some("12345"));
        store.flush();

        assert_eq!(backend.get("barcode").unwrap(), Some("12345".to_string()));
    }

    #[test]
    fn test_write_none_deletes() {
        let (backend, store) = store_for(DEFAULT_LIBRARY_UUID);

        store.write("barcode", Some("12345"));
        store.write("barcode", None);
        store.flush();

        assert_eq!(store.read("barcode"), None);
        assert_eq!(backend.get("barcode").unwrap(), None);
    }

    #[test]
    fn test_backend_write_failure_keeps_cache() {
        let store = CredentialStore::new(Arc::new(BrokenStorage), DEFAULT_LIBRARY_UUID);

        store.write("credentials", Some("v1"));
        store.flush();

        // The flush failed, but reads still serve the cached value.
        assert_eq!(store.read("credentials"), Some("v1".to_string()));
    }

    #[test]
    fn test_rekey_invalidates_cache() {
        let (_backend, store) = store_for("urn:uuid:lib-a");

        store.write("credentials", Some("for-a"));
        assert_eq!(store.read("credentials"), Some("for-a".to_string()));

        store.rekey("urn:uuid:lib-b");
        assert_eq!(store.read("credentials"), None);
        assert_eq!(store.generation(), 1);

        // Switching back re-reads library A's value from the backend.
        store.flush();
        store.rekey("urn:uuid:lib-a");
        assert_eq!(store.read("credentials"), Some("for-a".to_string()));
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_rekey_same_library_is_noop() {
        let (_backend, store) = store_for("urn:uuid:lib-a");

        store.write("credentials", Some("v1"));
        store.rekey("urn:uuid:lib-a");

        assert_eq!(store.generation(), 0);
        assert_eq!(store.read("credentials"), Some("v1".to_string()));
    }

    #[test]
    fn test_namespace_isolation() {
        let backend = Arc::new(MemoryStorage::new());
        let store_a = CredentialStore::new(backend.clone(), "urn:uuid:lib-a");
        let store_b = CredentialStore::new(backend.clone(), "urn:uuid:lib-b");

        store_a.write("credentials", Some("for-a"));
        store_a.flush();

        assert_eq!(store_b.read("credentials"), None);

        store_b.write("credentials", Some("for-b"));
        store_b.flush();

        assert_eq!(store_a.read("credentials"), Some("for-a".to_string()));
        assert_eq!(store_b.read("credentials"), Some("for-b".to_string()));
    }

    #[test]
    fn test_transaction_is_reentrant() {
        let (_backend, store) = store_for(DEFAULT_LIBRARY_UUID);

        let value = store.transaction(|| {
            store.write("barcode", Some("12345"));
            store.transaction(|| store.write("pin", Some("9999")));
            store.read("barcode")
        });

        assert_eq!(value, Some("12345".to_string()));
        assert_eq!(store.read("pin"), Some("9999".to_string()));
    }

    #[test]
    fn test_transaction_groups_related_writes() {
        let backend = Arc::new(MemoryStorage::new());
        let store = Arc::new(CredentialStore::new(backend, DEFAULT_LIBRARY_UUID));

        store.transaction(|| {
            store.write("barcode", Some("old"));
            store.write("pin", Some("old"));
        });

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    store.transaction(|| {
                        store.write("barcode", Some("new"));
                        store.write("pin", Some("new"));
                    });
                    store.transaction(|| {
                        store.write("barcode", Some("old"));
                        store.write("pin", Some("old"));
                    });
                }
            })
        };

        for _ in 0..200 {
            let (barcode, pin) =
                store.transaction(|| (store.read("barcode"), store.read("pin")));
            // Both fields always belong to the same grouped write.
            assert_eq!(barcode, pin);
        }

        writer.join().unwrap();
    }

    #[test]
    fn test_json_round_trip() {
        let (_backend, store) = store_for(DEFAULT_LIBRARY_UUID);

        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Sample {
            name: String,
            count: u32,
        }

        let sample = Sample {
            name: "x".to_string(),
            count: 3,
        };
        store.write_json("licensor", Some(&sample));

        assert_eq!(store.read_json::<Sample>("licensor"), Some(sample));
    }

    #[test]
    fn test_unparsable_json_reads_as_none() {
        let (_backend, store) = store_for(DEFAULT_LIBRARY_UUID);

        store.write("licensor", Some("not json"));
        assert_eq!(store.read_json::<serde_json::Value>("licensor"), None);
    }

    #[test]
    fn test_flags_default_false() {
        let (_backend, store) = store_for(DEFAULT_LIBRARY_UUID);

        assert!(!store.read_flag("eula_accepted"));
        store.write_flag("eula_accepted", true);
        assert!(store.read_flag("eula_accepted"));
    }
}
