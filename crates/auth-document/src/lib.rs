//! OPDS2 authentication document model for the Openshelf account core.
//!
//! This crate parses the per-library authentication document into a
//! normalized scheme list plus derived feature flags, and models the two
//! related server payloads the sign-in flow consumes: RFC 7807 problem
//! documents and the patron user-profile document.

mod document;
mod error;
mod links;
mod problem;
mod scheme;
mod user_profile;

pub use document::AuthenticationDocument;
pub use error::{ParseError, ParseResult};
pub use links::{rels, Link, UrlType, CARD_CREATOR_SCHEME_PREFIX, RESERVATIONS_FEATURE};
pub use problem::{ProblemDocument, TYPE_CREDENTIALS_INVALID};
pub use scheme::{AuthType, AuthenticationScheme, LoginKeyboard, PASSCODE_LENGTH_UNSPECIFIED};
pub use user_profile::{DrmObject, UserProfileDocument, UserProfileSettings};
