//! The unified patron credential and its legacy-key migration.

use patron_storage::{CredentialStore, StorageKeys};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A patron credential. At most one variant is active per library; writing
/// a new variant fully replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    BarcodeAndPin { barcode: String, pin: String },
    Token { auth_token: String },
    Cookies { cookies: Vec<String> },
}

impl Credential {
    /// The bearer token, when this credential carries one.
    pub fn auth_token(&self) -> Option<&str> {
        match self {
            Credential::Token { auth_token } => Some(auth_token),
            _ => None,
        }
    }

    /// The login barcode, when this credential carries one.
    pub fn barcode(&self) -> Option<&str> {
        match self {
            Credential::BarcodeAndPin { barcode, .. } => Some(barcode),
            _ => None,
        }
    }

    /// The PIN, when this credential carries one.
    pub fn pin(&self) -> Option<&str> {
        match self {
            Credential::BarcodeAndPin { pin, .. } => Some(pin),
            _ => None,
        }
    }
}

/// Read the credential from the store, migrating legacy single-purpose keys
/// to the unified key on first read.
///
/// Migration is best effort: unparsable legacy data reads as "no credential"
/// and never errors. Once the unified key exists, legacy keys are ignored
/// (and have been cleared), so the migration runs at most once.
pub(crate) fn load(store: &CredentialStore) -> Option<Credential> {
    store.transaction(|| {
        if let Some(credential) = store.read_json::<Credential>(StorageKeys::CREDENTIALS) {
            return Some(credential);
        }
        migrate_legacy(store)
    })
}

/// Write the credential to the unified key; `None` deletes it.
pub(crate) fn save(store: &CredentialStore, credential: Option<&Credential>) {
    store.write_json(StorageKeys::CREDENTIALS, credential);
}

fn migrate_legacy(store: &CredentialStore) -> Option<Credential> {
    let legacy = read_legacy(store)?;

    info!(
        library = %store.library_uuid(),
        "Migrating legacy credential keys to unified credential"
    );
    store.transaction(|| {
        save(store, Some(&legacy));
        store.write(StorageKeys::BARCODE, None);
        store.write(StorageKeys::PIN, None);
        store.write(StorageKeys::AUTH_TOKEN, None);
        store.write(StorageKeys::COOKIES, None);
    });
    Some(legacy)
}

fn read_legacy(store: &CredentialStore) -> Option<Credential> {
    if let (Some(barcode), Some(pin)) = (
        store.read(StorageKeys::BARCODE),
        store.read(StorageKeys::PIN),
    ) {
        return Some(Credential::BarcodeAndPin { barcode, pin });
    }
    if let Some(auth_token) = store.read(StorageKeys::AUTH_TOKEN) {
        return Some(Credential::Token { auth_token });
    }
    if let Some(cookies) = store.read_json::<Vec<String>>(StorageKeys::COOKIES) {
        return Some(Credential::Cookies { cookies });
    }
    debug!("No legacy credential keys found");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::memory_store;
    use patron_storage::DEFAULT_LIBRARY_UUID;

    #[test]
    fn test_no_credential_reads_none() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        assert_eq!(load(&store), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        let credential = Credential::Token {
            auth_token: "tok-1".to_string(),
        };
        save(&store, Some(&credential));
        assert_eq!(load(&store), Some(credential));
    }

    #[test]
    fn test_new_variant_replaces_old() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        save(
            &store,
            Some(&Credential::BarcodeAndPin {
                barcode: "23333999999915".to_string(),
                pin: "1234".to_string(),
            }),
        );
        save(
            &store,
            Some(&Credential::Token {
                auth_token: "tok-2".to_string(),
            }),
        );

        // No trace of the previous variant remains.
        let loaded = load(&store).unwrap();
        assert_eq!(loaded.auth_token(), Some("tok-2"));
        assert_eq!(loaded.barcode(), None);
    }

    #[test]
    fn test_legacy_barcode_and_pin_migrates() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        store.write(StorageKeys::BARCODE, Some("23333999999915"));
        store.write(StorageKeys::PIN, Some("1234"));

        let migrated = load(&store).unwrap();
        assert_eq!(migrated.barcode(), Some("23333999999915"));
        assert_eq!(migrated.pin(), Some("1234"));

        // Legacy keys are gone and the unified key holds the value.
        assert_eq!(store.read(StorageKeys::BARCODE), None);
        assert_eq!(store.read(StorageKeys::PIN), None);
        assert!(store.read(StorageKeys::CREDENTIALS).is_some());
    }

    #[test]
    fn test_legacy_token_migrates() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        store.write(StorageKeys::AUTH_TOKEN, Some("tok-legacy"));

        assert_eq!(
            load(&store).unwrap().auth_token(),
            Some("tok-legacy")
        );
        assert_eq!(store.read(StorageKeys::AUTH_TOKEN), None);
    }

    #[test]
    fn test_legacy_cookies_migrate() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        store.write(
            StorageKeys::COOKIES,
            Some(r#"["session=abc123; Path=/", "lang=en"]"#),
        );

        let migrated = load(&store).unwrap();
        assert_eq!(
            migrated,
            Credential::Cookies {
                cookies: vec![
                    "session=abc123; Path=/".to_string(),
                    "lang=en".to_string()
                ],
            }
        );

        // Legacy key is cleared and the unified key holds the value.
        assert_eq!(store.read(StorageKeys::COOKIES), None);
        assert!(store.read(StorageKeys::CREDENTIALS).is_some());
    }

    #[test]
    fn test_migration_is_idempotent() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        store.write(StorageKeys::BARCODE, Some("23333999999915"));
        store.write(StorageKeys::PIN, Some("1234"));

        let first = load(&store);
        // Tampering with a re-created legacy key no longer matters.
        store.write(StorageKeys::BARCODE, Some("different"));
        store.write(StorageKeys::PIN, Some("9999"));
        let second = load(&store);

        assert_eq!(first, second);
    }

    #[test]
    fn test_unparsable_legacy_cookies_read_as_none() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        store.write(StorageKeys::COOKIES, Some("not a json array"));

        assert_eq!(load(&store), None);
    }

    #[test]
    fn test_unparsable_unified_key_falls_through_to_legacy() {
        let store = memory_store(DEFAULT_LIBRARY_UUID);
        store.write(StorageKeys::CREDENTIALS, Some("corrupt"));
        store.write(StorageKeys::AUTH_TOKEN, Some("tok-legacy"));

        assert_eq!(load(&store).unwrap().auth_token(), Some("tok-legacy"));
    }
}
