//! Link objects and the rel vocabulary used across library documents.

use serde::{Deserialize, Serialize};

/// Link relations recognized in authentication and profile documents.
pub mod rels {
    /// Patron user-profile endpoint
    pub const USER_PROFILE: &str = "http://librarysimplified.org/terms/rel/user-profile";
    /// Patron loans feed
    pub const SHELF: &str = "http://opds-spec.org/shelf";
    /// Card sign-up flow
    pub const REGISTER: &str = "register";
    /// Per-scheme authentication endpoint (OAuth intermediary / SAML IdP)
    pub const AUTHENTICATE: &str = "authenticate";
    /// COPPA redirect for patrons under the age limit
    pub const COPPA_UNDER: &str =
        "http://librarysimplified.org/terms/rel/authentication/restriction-not-met";
    /// COPPA redirect for patrons at or above the age limit
    pub const COPPA_OVER: &str =
        "http://librarysimplified.org/terms/rel/authentication/restriction-met";
    pub const PRIVACY_POLICY: &str = "privacy-policy";
    pub const TERMS_OF_SERVICE: &str = "terms-of-service";
    pub const LICENSE: &str = "license";
    pub const COPYRIGHT: &str = "copyright";
}

/// Feature URI advertised by libraries that support holds/reservations.
pub const RESERVATIONS_FEATURE: &str = "https://librarysimplified.org/rel/policy/reservations";

/// Custom scheme prefix marking a `register` link as a card-creator flow.
pub const CARD_CREATOR_SCHEME_PREFIX: &str = "nypl.card-creator:";

/// A link entry in an authentication or profile document.
///
/// Everything is optional; malformed links are skipped, never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(rename = "type", default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub templated: Option<bool>,
}

/// Policy/license URL categories persisted per library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlType {
    PrivacyPolicy,
    TermsOfService,
    License,
    Copyright,
}

impl UrlType {
    /// All categories, in a stable order.
    pub const ALL: [UrlType; 4] = [
        UrlType::PrivacyPolicy,
        UrlType::TermsOfService,
        UrlType::License,
        UrlType::Copyright,
    ];

    /// The link rel this category is derived from.
    pub fn rel(self) -> &'static str {
        match self {
            UrlType::PrivacyPolicy => rels::PRIVACY_POLICY,
            UrlType::TermsOfService => rels::TERMS_OF_SERVICE,
            UrlType::License => rels::LICENSE,
            UrlType::Copyright => rels::COPYRIGHT,
        }
    }

    /// Stable storage-key suffix for persisting this URL.
    pub fn storage_suffix(self) -> &'static str {
        match self {
            UrlType::PrivacyPolicy => "privacy_policy",
            UrlType::TermsOfService => "terms_of_service",
            UrlType::License => "license",
            UrlType::Copyright => "copyright",
        }
    }
}

/// Find the href of the first link with the given rel.
pub fn href_for_rel<'a>(links: &'a [Link], rel: &str) -> Option<&'a str> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some(rel))
        .and_then(|l| l.href.as_deref())
}
