//! Linux Secret Service implementation.

use crate::{SecureStorage, StorageError, StorageResult};
use secret_service::blocking::SecretService;
use secret_service::EncryptionType;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

/// Secret Service backed secure storage for Linux.
///
/// Entries live in the session's default collection as generic secrets,
/// tagged with the application id and the entry key so searches never match
/// secrets owned by other applications.
pub struct SecretServiceStorage {
    application: String,
}

impl SecretServiceStorage {
    /// Create a new Secret Service storage instance.
    ///
    /// Fails fast when no Secret Service daemon is reachable on the session
    /// bus, so a misconfigured desktop surfaces at startup rather than on
    /// the first credential write.
    pub fn new(service_name: &str) -> StorageResult<Self> {
        SecretService::connect(EncryptionType::Dh)
            .map_err(|e| platform_error("reach the Secret Service", e))?;

        Ok(Self {
            application: service_name.to_string(),
        })
    }

    fn tags<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([
            ("application", self.application.as_str()),
            ("account", key),
        ])
    }

    /// Run `f` against the unlocked default collection. The bus connection
    /// is not retained; every operation reconnects.
    fn in_collection<T>(
        &self,
        f: impl FnOnce(&secret_service::blocking::Collection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let service = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| platform_error("reach the Secret Service", e))?;

        let collection = service
            .get_default_collection()
            .map_err(|e| platform_error("open the default collection", e))?;

        if collection.is_locked().unwrap_or(false) {
            collection
                .unlock()
                .map_err(|e| platform_error("unlock the default collection", e))?;
        }

        f(&collection)
    }
}

fn platform_error(action: &str, e: impl Display) -> StorageError {
    StorageError::Platform(format!("Failed to {action}: {e}"))
}

impl SecureStorage for SecretServiceStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(application = %self.application, key = %key, "Writing secret");

        self.in_collection(|collection| {
            let label = format!("{} {}", self.application, key);

            // `replace` overwrites an item with identical tags, so an
            // update is one round trip.
            collection
                .create_item(&label, self.tags(key), value.as_bytes(), true, "text/plain")
                .map_err(|e| platform_error("store the secret", e))?;

            Ok(())
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(application = %self.application, key = %key, "Reading secret");

        self.in_collection(|collection| {
            let found = collection
                .search_items(self.tags(key))
                .map_err(|e| platform_error("search for the secret", e))?;

            let Some(item) = found.into_iter().next() else {
                return Ok(None);
            };

            let secret = item
                .get_secret()
                .map_err(|e| platform_error("read the secret", e))?;

            String::from_utf8(secret)
                .map(Some)
                .map_err(|e| StorageError::Encoding(e.to_string()))
        })
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(application = %self.application, key = %key, "Deleting secret");

        self.in_collection(|collection| {
            let found = collection
                .search_items(self.tags(key))
                .map_err(|e| platform_error("search for the secret", e))?;

            // Duplicate tags should be impossible, but clear every match so
            // delete stays idempotent against a dirty collection.
            let mut removed = false;
            for item in found {
                item.delete()
                    .map_err(|e| platform_error("delete the secret", e))?;
                removed = true;
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These touch the real session bus; run with --ignored on a desktop
    // Linux box with a Secret Service daemon.

    const TEST_SERVICE: &str = "org.openshelf.patron.test";

    #[test]
    #[ignore] // Requires a Secret Service daemon (D-Bus session)
    fn test_secret_round_trip_and_overwrite() {
        let storage = SecretServiceStorage::new(TEST_SERVICE).unwrap();
        let _ = storage.delete("round_trip");

        storage.set("round_trip", "first").unwrap();
        assert_eq!(storage.get("round_trip").unwrap().as_deref(), Some("first"));

        // Same tags, new value: overwrite, not a second item.
        storage.set("round_trip", "second").unwrap();
        assert_eq!(
            storage.get("round_trip").unwrap().as_deref(),
            Some("second")
        );

        assert!(storage.delete("round_trip").unwrap());
        assert!(!storage.delete("round_trip").unwrap());
        assert_eq!(storage.get("round_trip").unwrap(), None);
    }

    #[test]
    #[ignore] // Requires a Secret Service daemon (D-Bus session)
    fn test_missing_key_reads_none() {
        let storage = SecretServiceStorage::new(TEST_SERVICE).unwrap();
        assert_eq!(storage.get("never_written").unwrap(), None);
        assert!(!storage.has("never_written").unwrap());
    }
}
