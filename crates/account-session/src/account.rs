//! Library account details derived from an authentication document.

use auth_document::{AuthType, AuthenticationDocument, AuthenticationScheme, UrlType};
use patron_storage::StorageKeys;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::session::UserAccountSession;

/// One library's capabilities and endpoints, as declared by its most
/// recently fetched authentication document.
///
/// An `AccountDetails` is an immutable snapshot; a fresh document fetch
/// builds a replacement rather than mutating in place. The per-library
/// boolean flags and the policy/license URLs live in the session store, so
/// they survive document refreshes and transient server omissions.
pub struct AccountDetails {
    document: AuthenticationDocument,
    session: Arc<UserAccountSession>,
}

impl AccountDetails {
    /// Build account details from a parsed document, persisting any
    /// policy/license URLs it carries.
    pub fn new(document: AuthenticationDocument, session: Arc<UserAccountSession>) -> Self {
        session.transaction(|| {
            for (url_type, url) in &document.license_urls {
                session
                    .store()
                    .write(&license_url_key(*url_type), Some(url.as_str()));
            }
        });
        debug!(
            library = %document.id,
            persisted_urls = document.license_urls.len(),
            "Built account details"
        );
        Self { document, session }
    }

    pub fn uuid(&self) -> &str {
        &self.document.id
    }

    pub fn title(&self) -> &str {
        &self.document.title
    }

    pub fn session(&self) -> &Arc<UserAccountSession> {
        &self.session
    }

    /// Schemes in document order; the first is the default.
    pub fn schemes(&self) -> &[AuthenticationScheme] {
        &self.document.schemes
    }

    pub fn default_scheme(&self) -> Option<&AuthenticationScheme> {
        self.document.default_scheme()
    }

    pub fn scheme_of_type(&self, auth_type: AuthType) -> Option<&AuthenticationScheme> {
        self.document.scheme_of_type(auth_type)
    }

    pub fn user_profile_url(&self) -> Option<&Url> {
        self.document.user_profile_url.as_ref()
    }

    pub fn loans_url(&self) -> Option<&Url> {
        self.document.loans_url.as_ref()
    }

    pub fn sign_up_url(&self) -> Option<&Url> {
        self.document.sign_up_url.as_ref()
    }

    pub fn supports_card_creator(&self) -> bool {
        self.document.supports_card_creator
    }

    pub fn supports_reservations(&self) -> bool {
        self.document.supports_reservations
    }

    /// Annotation sync requires a patron profile endpoint.
    pub fn supports_sync(&self) -> bool {
        self.document.user_profile_url.is_some()
    }

    /// A policy/license URL, falling back to the last persisted value when
    /// the current document omits the link.
    pub fn license_url(&self, url_type: UrlType) -> Option<Url> {
        if let Some(url) = self.document.license_urls.get(&url_type) {
            return Some(url.clone());
        }
        self.session
            .store()
            .read(&license_url_key(url_type))
            .and_then(|raw| Url::parse(&raw).ok())
    }

    // Per-library persisted flags, default false

    pub fn eula_accepted(&self) -> bool {
        self.session.store().read_flag(StorageKeys::EULA_ACCEPTED)
    }

    pub fn set_eula_accepted(&self, accepted: bool) {
        self.session
            .store()
            .write_flag(StorageKeys::EULA_ACCEPTED, accepted);
    }

    pub fn sync_permission_granted(&self) -> bool {
        self.session.store().read_flag(StorageKeys::SYNC_PERMISSION)
    }

    pub fn set_sync_permission_granted(&self, granted: bool) {
        self.session
            .store()
            .write_flag(StorageKeys::SYNC_PERMISSION, granted);
    }

    pub fn user_above_age_limit(&self) -> bool {
        self.session
            .store()
            .read_flag(StorageKeys::ABOVE_AGE_LIMIT)
    }

    pub fn set_user_above_age_limit(&self, above: bool) {
        self.session
            .store()
            .write_flag(StorageKeys::ABOVE_AGE_LIMIT, above);
    }
}

fn license_url_key(url_type: UrlType) -> String {
    format!(
        "{}_{}",
        StorageKeys::LICENSE_URL_PREFIX,
        url_type.storage_suffix()
    )
}
