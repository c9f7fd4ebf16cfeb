//! Secure credential storage for the Openshelf account core.
//!
//! This crate provides platform-specific secure storage implementations:
//! - **macOS**: Keychain Access via `security-framework`
//! - **Linux**: Secret Service (GNOME Keyring / KWallet) via `secret-service`
//! - **Windows**: Credential Vault via `windows` crate
//!
//! On top of the raw backends sits [`CredentialStore`], the transactional,
//! library-namespaced, cached store every other crate goes through.

mod keys;
mod store;
mod traits;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

pub use keys::{scoped_key, StorageKeys, DEFAULT_LIBRARY_UUID};
pub use store::CredentialStore;
pub use traits::SecureStorage;

use std::sync::Arc;
use thiserror::Error;

/// Service name used for all storage operations.
/// Must stay stable across releases so existing patron credentials remain readable.
pub const SERVICE_NAME: &str = "org.openshelf.patron";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Platform-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default platform-specific storage implementation.
pub fn create_storage() -> StorageResult<Arc<dyn SecureStorage>> {
    #[cfg(target_os = "macos")]
    {
        let storage = macos::KeychainStorage::new(SERVICE_NAME)?;
        Ok(Arc::new(storage))
    }

    #[cfg(target_os = "linux")]
    {
        let storage = linux::SecretServiceStorage::new(SERVICE_NAME)?;
        Ok(Arc::new(storage))
    }

    #[cfg(target_os = "windows")]
    {
        let storage = windows::VaultStorage::new(SERVICE_NAME)?;
        Ok(Arc::new(storage))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(StorageError::Platform(
            "No secure storage implementation available for this platform".to_string(),
        ))
    }
}

/// Create a CredentialStore over the default platform storage, scoped to a library.
pub fn create_credential_store(library_uuid: &str) -> StorageResult<CredentialStore> {
    let storage = create_storage()?;
    Ok(CredentialStore::new(storage, library_uuid))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory storage for testing
    pub struct MemoryStorage {
        data: std::sync::Mutex<std::collections::HashMap<String, String>>,
    }

    impl MemoryStorage {
        pub fn new() -> Self {
            Self {
                data: std::sync::Mutex::new(std::collections::HashMap::new()),
            }
        }
    }

    impl SecureStorage for MemoryStorage {
        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            let mut data = self.data.lock().unwrap();
            data.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            let data = self.data.lock().unwrap();
            Ok(data.get(key).cloned())
        }

        fn delete(&self, key: &str) -> StorageResult<bool> {
            let mut data = self.data.lock().unwrap();
            Ok(data.remove(key).is_some())
        }
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        // Test set and get
        storage.set("test_key", "test_value").unwrap();
        assert_eq!(
            storage.get("test_key").unwrap(),
            Some("test_value".to_string())
        );

        // Test has
        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        // Test delete
        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }

    #[test]
    fn test_storage_keys_unique() {
        let keys = vec![
            StorageKeys::BARCODE,
            StorageKeys::PIN,
            StorageKeys::CREDENTIALS,
            StorageKeys::AUTH_TOKEN,
            StorageKeys::COOKIES,
            StorageKeys::AUTHORIZATION_IDENTIFIER,
            StorageKeys::SELECTED_AUTH_SCHEME,
            StorageKeys::ADOBE_TOKEN,
            StorageKeys::LICENSOR,
            StorageKeys::PATRON,
            StorageKeys::PROVIDER,
            StorageKeys::USER_ID,
            StorageKeys::DEVICE_ID,
            StorageKeys::EULA_ACCEPTED,
            StorageKeys::SYNC_PERMISSION,
            StorageKeys::ABOVE_AGE_LIMIT,
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }
}
