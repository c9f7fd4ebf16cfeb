//! Patron user-profile document, returned by the profile endpoint during
//! sign-in validation.

use serde::Deserialize;

use crate::error::ParseResult;
use crate::links::Link;

/// One `drm[]` entry in a user profile.
#[derive(Debug, Clone, Deserialize)]
pub struct DrmObject {
    #[serde(rename = "drm:vendor", default)]
    pub vendor: Option<String>,
    #[serde(rename = "drm:clientToken", default)]
    pub client_token: Option<String>,
    #[serde(rename = "drm:scheme", default)]
    pub scheme: Option<String>,
}

/// Patron settings embedded in the profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfileSettings {
    #[serde(rename = "simplified:synchronize_annotations", default)]
    pub synchronize_annotations: Option<bool>,
}

/// The patron user-profile document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfileDocument {
    #[serde(rename = "simplified:authorization_identifier", default)]
    pub authorization_identifier: Option<String>,
    #[serde(default)]
    pub drm: Vec<DrmObject>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub settings: Option<UserProfileSettings>,
}

impl UserProfileDocument {
    pub fn parse(bytes: &[u8]) -> ParseResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The first DRM entry carrying both a vendor and a client token.
    pub fn usable_drm(&self) -> Option<&DrmObject> {
        self.drm
            .iter()
            .find(|d| d.vendor.is_some() && d.client_token.is_some())
    }

    /// Whether the server reports annotations sync as enabled.
    pub fn annotations_sync_enabled(&self) -> bool {
        self.settings
            .as_ref()
            .and_then(|s| s.synchronize_annotations)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "simplified:authorization_identifier": "23333999999915",
        "drm": [
            {
                "drm:vendor": "NYPL",
                "drm:clientToken": "NYNYPL|1569044555|5deadbeef|LEpmbYhqbAZCLbZNmeKa8",
                "drm:scheme": "http://librarysimplified.org/terms/drm/scheme/ACS"
            }
        ],
        "settings": {
            "simplified:synchronize_annotations": true
        }
    }"#;

    #[test]
    fn test_parse_profile() {
        let profile = UserProfileDocument::parse(PROFILE.as_bytes()).unwrap();
        assert_eq!(
            profile.authorization_identifier.as_deref(),
            Some("23333999999915")
        );
        let drm = profile.usable_drm().unwrap();
        assert_eq!(drm.vendor.as_deref(), Some("NYPL"));
        assert!(drm.client_token.as_deref().unwrap().contains('|'));
        assert!(profile.annotations_sync_enabled());
    }

    #[test]
    fn test_empty_profile_has_defaults() {
        let profile = UserProfileDocument::parse(b"{}").unwrap();
        assert!(profile.authorization_identifier.is_none());
        assert!(profile.usable_drm().is_none());
        assert!(!profile.annotations_sync_enabled());
    }

    #[test]
    fn test_drm_entry_without_token_is_not_usable() {
        let json = r#"{"drm": [{"drm:vendor": "NYPL"}]}"#;
        let profile = UserProfileDocument::parse(json.as_bytes()).unwrap();
        assert!(profile.usable_drm().is_none());
    }
}
