//! Per-library account session.

use auth_document::AuthenticationScheme;
use patron_storage::{CredentialStore, SecureStorage, StorageKeys};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::credential::{self, Credential};

/// All persisted patron state for one library.
///
/// Every accessor goes through the library-scoped [`CredentialStore`], so
/// two sessions for different libraries never see each other's values even
/// though they share one backend. Fields are independently settable; `None`
/// clears.
pub struct UserAccountSession {
    library_uuid: String,
    store: CredentialStore,
}

impl UserAccountSession {
    pub(crate) fn new(backend: Arc<dyn SecureStorage>, library_uuid: &str) -> Self {
        Self {
            library_uuid: library_uuid.to_string(),
            store: CredentialStore::new(backend, library_uuid),
        }
    }

    pub fn library_uuid(&self) -> &str {
        &self.library_uuid
    }

    /// The backing store, for grouped multi-field writes.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Run `f` with the store's transaction lock held.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        self.store.transaction(f)
    }

    // Credential

    /// The active credential, migrating legacy keys on first read.
    pub fn credential(&self) -> Option<Credential> {
        credential::load(&self.store)
    }

    /// Replace the active credential; `None` clears it.
    pub fn set_credential(&self, value: Option<&Credential>) {
        credential::save(&self.store, value);
    }

    pub fn is_signed_in(&self) -> bool {
        self.credential().is_some()
    }

    // Server-confirmed identity

    pub fn authorization_identifier(&self) -> Option<String> {
        self.store.read(StorageKeys::AUTHORIZATION_IDENTIFIER)
    }

    pub fn set_authorization_identifier(&self, value: Option<&str>) {
        self.store.write(StorageKeys::AUTHORIZATION_IDENTIFIER, value);
    }

    // Scheme selection

    pub fn selected_auth_scheme(&self) -> Option<AuthenticationScheme> {
        self.store.read_json(StorageKeys::SELECTED_AUTH_SCHEME)
    }

    pub fn set_selected_auth_scheme(&self, value: Option<&AuthenticationScheme>) {
        self.store.write_json(StorageKeys::SELECTED_AUTH_SCHEME, value);
    }

    // DRM fields, each independently settable

    pub fn adobe_token(&self) -> Option<String> {
        self.store.read(StorageKeys::ADOBE_TOKEN)
    }

    pub fn set_adobe_token(&self, value: Option<&str>) {
        self.store.write(StorageKeys::ADOBE_TOKEN, value);
    }

    pub fn licensor(&self) -> Option<Value> {
        self.store.read_json(StorageKeys::LICENSOR)
    }

    pub fn set_licensor(&self, value: Option<&Value>) {
        self.store.write_json(StorageKeys::LICENSOR, value);
    }

    pub fn patron(&self) -> Option<Value> {
        self.store.read_json(StorageKeys::PATRON)
    }

    pub fn set_patron(&self, value: Option<&Value>) {
        self.store.write_json(StorageKeys::PATRON, value);
    }

    pub fn provider(&self) -> Option<String> {
        self.store.read(StorageKeys::PROVIDER)
    }

    pub fn set_provider(&self, value: Option<&str>) {
        self.store.write(StorageKeys::PROVIDER, value);
    }

    pub fn user_id(&self) -> Option<String> {
        self.store.read(StorageKeys::USER_ID)
    }

    pub fn set_user_id(&self, value: Option<&str>) {
        self.store.write(StorageKeys::USER_ID, value);
    }

    pub fn device_id(&self) -> Option<String> {
        self.store.read(StorageKeys::DEVICE_ID)
    }

    pub fn set_device_id(&self, value: Option<&str>) {
        self.store.write(StorageKeys::DEVICE_ID, value);
    }

    // Sign-out

    /// Full sign-out: clear every field, including DRM device and vendor
    /// identifiers.
    pub fn remove_all(&self) {
        info!(library = %self.library_uuid, "Clearing all session fields");
        self.store.transaction(|| {
            self.clear_credential_fields();
            self.set_selected_auth_scheme(None);
            self.set_adobe_token(None);
            self.set_licensor(None);
            self.set_patron(None);
            self.set_provider(None);
            self.set_user_id(None);
            self.set_device_id(None);
        });
    }

    /// Credential-only sign-out: keeps DRM device and vendor identifiers so
    /// a future sign-in doesn't need device re-activation.
    pub fn remove_barcode_and_pin(&self) {
        info!(library = %self.library_uuid, "Clearing credential fields");
        self.store.transaction(|| self.clear_credential_fields());
    }

    fn clear_credential_fields(&self) {
        self.set_credential(None);
        self.set_authorization_identifier(None);
        self.store.write(StorageKeys::BARCODE, None);
        self.store.write(StorageKeys::PIN, None);
        self.store.write(StorageKeys::AUTH_TOKEN, None);
        self.store.write(StorageKeys::COOKIES, None);
    }
}
