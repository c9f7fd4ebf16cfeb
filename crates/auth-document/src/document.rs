//! OPDS2 authentication document parsing.
//!
//! Parsing is two-phase: a tolerant serde layer accepts whatever the server
//! sends (unknown fields ignored, almost everything optional), then an
//! explicit normalization step enforces the few required fields and derives
//! the scheme list and feature flags. The result is a pure function of the
//! input bytes; persistence decisions belong to the caller.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{ParseError, ParseResult};
use crate::links::{href_for_rel, rels, Link, UrlType, CARD_CREATOR_SCHEME_PREFIX, RESERVATIONS_FEATURE};
use crate::scheme::{
    barcode_supported, AuthType, AuthenticationScheme, LoginKeyboard, PASSCODE_LENGTH_UNSPECIFIED,
};

/// Raw wire shape, kept private to this module.
#[derive(Debug, Deserialize)]
struct RawDocument {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    authentication: Vec<RawAuthentication>,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    features: Option<RawFeatures>,
}

#[derive(Debug, Deserialize)]
struct RawAuthentication {
    #[serde(rename = "type")]
    type_uri: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    inputs: Option<RawInputs>,
    #[serde(default)]
    labels: Option<RawLabels>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct RawInputs {
    #[serde(default)]
    login: Option<RawInput>,
    #[serde(default)]
    password: Option<RawInput>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    #[serde(default)]
    keyboard: Option<String>,
    #[serde(default)]
    maximum_length: Option<u32>,
    #[serde(default)]
    barcode_format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLabels {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFeatures {
    #[serde(default)]
    enabled: Vec<String>,
}

/// Normalized authentication document for one library.
#[derive(Debug, Clone)]
pub struct AuthenticationDocument {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Schemes in document order; the first is the default.
    pub schemes: Vec<AuthenticationScheme>,
    pub sign_up_url: Option<Url>,
    pub supports_card_creator: bool,
    pub user_profile_url: Option<Url>,
    pub loans_url: Option<Url>,
    pub supports_reservations: bool,
    /// Policy/license URLs found in this document, by category.
    pub license_urls: HashMap<UrlType, Url>,
}

impl AuthenticationDocument {
    /// Parse raw document bytes into a normalized document.
    ///
    /// Malformed top-level JSON or a missing `id`/`title` fails with
    /// [`ParseError::DecodeFailure`]; every other field is optional and
    /// degrades to a default rather than failing.
    pub fn parse(bytes: &[u8]) -> ParseResult<Self> {
        let raw: RawDocument = serde_json::from_slice(bytes)?;

        let id = raw
            .id
            .ok_or_else(|| ParseError::DecodeFailure("missing required field `id`".into()))?;
        let title = raw
            .title
            .ok_or_else(|| ParseError::DecodeFailure("missing required field `title`".into()))?;

        let schemes: Vec<AuthenticationScheme> = raw
            .authentication
            .iter()
            .map(normalize_scheme)
            .collect();

        let (sign_up_url, supports_card_creator) = derive_sign_up(&raw.links);

        let user_profile_url = parse_link_url(&raw.links, rels::USER_PROFILE);
        let loans_url = parse_link_url(&raw.links, rels::SHELF);

        let supports_reservations = raw
            .features
            .as_ref()
            .map(|f| f.enabled.iter().any(|u| u == RESERVATIONS_FEATURE))
            .unwrap_or(false);

        let mut license_urls = HashMap::new();
        for url_type in UrlType::ALL {
            if let Some(url) = parse_link_url(&raw.links, url_type.rel()) {
                license_urls.insert(url_type, url);
            }
        }

        debug!(
            library = %id,
            schemes = schemes.len(),
            card_creator = supports_card_creator,
            reservations = supports_reservations,
            "parsed authentication document"
        );

        Ok(AuthenticationDocument {
            id,
            title,
            description: raw.description,
            schemes,
            sign_up_url,
            supports_card_creator,
            user_profile_url,
            loans_url,
            supports_reservations,
            license_urls,
        })
    }

    /// The first scheme in document order, if any.
    pub fn default_scheme(&self) -> Option<&AuthenticationScheme> {
        self.schemes.first()
    }

    /// The first scheme of the given type, if any.
    pub fn scheme_of_type(&self, auth_type: AuthType) -> Option<&AuthenticationScheme> {
        self.schemes.iter().find(|s| s.auth_type == auth_type)
    }
}

fn normalize_scheme(raw: &RawAuthentication) -> AuthenticationScheme {
    let auth_type = raw
        .type_uri
        .as_deref()
        .map(AuthType::from_uri)
        .unwrap_or(AuthType::None);

    let login = raw.inputs.as_ref().and_then(|i| i.login.as_ref());
    let password = raw.inputs.as_ref().and_then(|i| i.password.as_ref());

    let passcode_length = password
        .and_then(|p| p.maximum_length)
        .unwrap_or(PASSCODE_LENGTH_UNSPECIFIED);

    let patron_id_keyboard = login
        .and_then(|l| l.keyboard.as_deref())
        .map(LoginKeyboard::from_document)
        .unwrap_or_default();
    let pin_keyboard = password
        .and_then(|p| p.keyboard.as_deref())
        .map(LoginKeyboard::from_document)
        .unwrap_or_default();

    let barcode = barcode_supported(login.and_then(|l| l.barcode_format.as_deref()));

    AuthenticationScheme {
        auth_type,
        description: raw.description.clone(),
        passcode_length,
        patron_id_keyboard,
        pin_keyboard,
        patron_id_label: raw.labels.as_ref().and_then(|l| l.login.clone()),
        pin_label: raw.labels.as_ref().and_then(|l| l.password.clone()),
        supports_barcode_scanner: barcode,
        supports_barcode_display: barcode,
        coppa_under_url: parse_link_url(&raw.links, rels::COPPA_UNDER),
        coppa_over_url: parse_link_url(&raw.links, rels::COPPA_OVER),
        oauth_intermediary_url: parse_link_url(&raw.links, rels::AUTHENTICATE),
    }
}

/// Derive the sign-up URL and card-creator flag from the `register` link.
///
/// A `nypl.card-creator:` prefix marks the in-app card-creator flow and is
/// stripped; any other href is used as-is even if it later turns out to be
/// unusable, since a possibly-wrong URL beats no sign-up path at all.
fn derive_sign_up(links: &[Link]) -> (Option<Url>, bool) {
    let Some(href) = href_for_rel(links, rels::REGISTER) else {
        return (None, false);
    };
    if let Some(stripped) = href.strip_prefix(CARD_CREATOR_SCHEME_PREFIX) {
        (Url::parse(stripped).ok(), true)
    } else {
        (Url::parse(href).ok(), false)
    }
}

fn parse_link_url(links: &[Link], rel: &str) -> Option<Url> {
    href_for_rel(links, rel).and_then(|href| Url::parse(href).ok())
}
