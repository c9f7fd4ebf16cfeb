//! Normalized authentication schemes.

use serde::{Deserialize, Serialize};
use url::Url;

/// Sentinel passcode length meaning the document didn't constrain it.
pub const PASSCODE_LENGTH_UNSPECIFIED: u32 = 99;

/// Barcode format whose presence enables scanner/display affordances.
const CODABAR: &str = "Codabar";

/// Authentication scheme type, mapped from the document's `type` URI.
///
/// Unrecognized URIs map to `None` rather than failing the parse, so newer
/// server-side schemes degrade gracefully on older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Basic,
    OauthIntermediary,
    OauthClientCredentials,
    Saml,
    Coppa,
    Anonymous,
    None,
}

impl AuthType {
    /// Map a scheme URI to its type by exact match against the known table.
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            "http://opds-spec.org/auth/basic" => AuthType::Basic,
            "http://librarysimplified.org/authtype/OAuth-with-intermediary" => {
                AuthType::OauthIntermediary
            }
            "http://librarysimplified.org/authtype/OAuth-Client-Credentials" => {
                AuthType::OauthClientCredentials
            }
            "http://librarysimplified.org/authtype/SAML-2.0" => AuthType::Saml,
            "http://librarysimplified.org/terms/authentication/gate/coppa" => AuthType::Coppa,
            "http://librarysimplified.org/rel/auth/anonymous" => AuthType::Anonymous,
            _ => AuthType::None,
        }
    }

    /// Whether sign-in with this scheme carries a bearer token.
    pub fn is_token_based(self) -> bool {
        matches!(
            self,
            AuthType::OauthIntermediary | AuthType::OauthClientCredentials | AuthType::Saml
        )
    }

    /// Whether this scheme requires patron-entered credentials at all.
    pub fn requires_credentials(self) -> bool {
        !matches!(self, AuthType::Coppa | AuthType::Anonymous | AuthType::None)
    }
}

/// Keyboard affordance for a login input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginKeyboard {
    Standard,
    Email,
    Numeric,
    None,
}

impl LoginKeyboard {
    /// Parse the document's keyboard string; unknown values read as Standard.
    pub fn from_document(value: &str) -> Self {
        match value {
            "Default" => LoginKeyboard::Standard,
            "Email address" => LoginKeyboard::Email,
            "Number pad" => LoginKeyboard::Numeric,
            "No input" => LoginKeyboard::None,
            _ => LoginKeyboard::Standard,
        }
    }
}

impl Default for LoginKeyboard {
    fn default() -> Self {
        LoginKeyboard::Standard
    }
}

/// One normalized `authentication[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationScheme {
    pub auth_type: AuthType,
    #[serde(default)]
    pub description: Option<String>,
    /// Maximum passcode length; 0 hides the PIN field,
    /// [`PASSCODE_LENGTH_UNSPECIFIED`] leaves it unconstrained.
    pub passcode_length: u32,
    #[serde(default)]
    pub patron_id_keyboard: LoginKeyboard,
    #[serde(default)]
    pub pin_keyboard: LoginKeyboard,
    #[serde(default)]
    pub patron_id_label: Option<String>,
    #[serde(default)]
    pub pin_label: Option<String>,
    #[serde(default)]
    pub supports_barcode_scanner: bool,
    #[serde(default)]
    pub supports_barcode_display: bool,
    #[serde(default)]
    pub coppa_under_url: Option<Url>,
    #[serde(default)]
    pub coppa_over_url: Option<Url>,
    #[serde(default)]
    pub oauth_intermediary_url: Option<Url>,
}

impl AuthenticationScheme {
    /// Whether the PIN field should be shown at all.
    pub fn requires_pin(&self) -> bool {
        self.passcode_length != 0 && self.pin_keyboard != LoginKeyboard::None
    }
}

pub(crate) fn barcode_supported(barcode_format: Option<&str>) -> bool {
    barcode_format == Some(CODABAR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_type_known_uris() {
        assert_eq!(
            AuthType::from_uri("http://opds-spec.org/auth/basic"),
            AuthType::Basic
        );
        assert_eq!(
            AuthType::from_uri("http://librarysimplified.org/authtype/SAML-2.0"),
            AuthType::Saml
        );
        assert_eq!(
            AuthType::from_uri("http://librarysimplified.org/terms/authentication/gate/coppa"),
            AuthType::Coppa
        );
    }

    #[test]
    fn test_auth_type_unknown_uri_is_none() {
        assert_eq!(
            AuthType::from_uri("http://example.com/auth/next-big-thing"),
            AuthType::None
        );
    }

    #[test]
    fn test_token_based_schemes() {
        assert!(AuthType::OauthIntermediary.is_token_based());
        assert!(AuthType::Saml.is_token_based());
        assert!(!AuthType::Basic.is_token_based());
        assert!(!AuthType::Coppa.is_token_based());
    }

    #[test]
    fn test_keyboard_parsing() {
        assert_eq!(
            LoginKeyboard::from_document("Default"),
            LoginKeyboard::Standard
        );
        assert_eq!(
            LoginKeyboard::from_document("Email address"),
            LoginKeyboard::Email
        );
        assert_eq!(
            LoginKeyboard::from_document("Number pad"),
            LoginKeyboard::Numeric
        );
        assert_eq!(
            LoginKeyboard::from_document("No input"),
            LoginKeyboard::None
        );
        // Unknown values degrade to the standard keyboard.
        assert_eq!(
            LoginKeyboard::from_document("Dvorak"),
            LoginKeyboard::Standard
        );
    }

    #[test]
    fn test_requires_pin() {
        let mut scheme = AuthenticationScheme {
            auth_type: AuthType::Basic,
            description: None,
            passcode_length: 4,
            patron_id_keyboard: LoginKeyboard::Standard,
            pin_keyboard: LoginKeyboard::Numeric,
            patron_id_label: None,
            pin_label: None,
            supports_barcode_scanner: false,
            supports_barcode_display: false,
            coppa_under_url: None,
            coppa_over_url: None,
            oauth_intermediary_url: None,
        };
        assert!(scheme.requires_pin());

        scheme.passcode_length = 0;
        assert!(!scheme.requires_pin());

        scheme.passcode_length = PASSCODE_LENGTH_UNSPECIFIED;
        scheme.pin_keyboard = LoginKeyboard::None;
        assert!(!scheme.requires_pin());
    }
}
