//! Storage key constants and library-scoped key derivation.

/// UUID of the default library.
///
/// Historically the client supported a single library and stored its values
/// under bare key names. Every later library gets a uuid-suffixed key. This
/// asymmetry must be preserved so existing patrons keep their credentials.
pub const DEFAULT_LIBRARY_UUID: &str = "urn:uuid:065c0c11-0d0f-42a3-82e4-277b18786949";

/// Storage keys used by the account core.
pub struct StorageKeys;

impl StorageKeys {
    /// Legacy login barcode (migration source)
    pub const BARCODE: &'static str = "barcode";

    /// Legacy PIN (migration source)
    pub const PIN: &'static str = "pin";

    /// Legacy bearer token (migration source)
    pub const AUTH_TOKEN: &'static str = "auth_token";

    /// Legacy session cookies (migration source, JSON array)
    pub const COOKIES: &'static str = "cookies";

    /// Unified credential (JSON tagged union)
    pub const CREDENTIALS: &'static str = "credentials";

    /// Server-confirmed patron identifier
    pub const AUTHORIZATION_IDENTIFIER: &'static str = "authorization_identifier";

    /// Persisted authentication scheme selection (JSON)
    pub const SELECTED_AUTH_SCHEME: &'static str = "selected_auth_scheme";

    /// DRM vendor token
    pub const ADOBE_TOKEN: &'static str = "adobe_token";

    /// DRM licensor bundle (JSON)
    pub const LICENSOR: &'static str = "licensor";

    /// DRM patron dictionary (JSON)
    pub const PATRON: &'static str = "patron";

    /// DRM provider name
    pub const PROVIDER: &'static str = "provider";

    /// DRM user identifier
    pub const USER_ID: &'static str = "user_id";

    /// DRM device identifier
    pub const DEVICE_ID: &'static str = "device_id";

    /// Per-library EULA acceptance flag
    pub const EULA_ACCEPTED: &'static str = "eula_accepted";

    /// Per-library annotations-sync opt-in flag
    pub const SYNC_PERMISSION: &'static str = "sync_permission";

    /// Per-library age-verification outcome
    pub const ABOVE_AGE_LIMIT: &'static str = "above_age_limit";

    /// Persisted policy/license URL, completed by a url-type suffix
    pub const LICENSE_URL_PREFIX: &'static str = "license_url";
}

/// Derive the physical storage key for a logical name in a library's namespace.
///
/// The default library uses the bare logical name; all others are suffixed
/// with the library uuid.
pub fn scoped_key(logical: &str, library_uuid: &str) -> String {
    if library_uuid == DEFAULT_LIBRARY_UUID {
        logical.to_string()
    } else {
        format!("{}_{}", logical, library_uuid)
    }
}
