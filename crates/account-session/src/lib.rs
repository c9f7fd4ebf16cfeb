//! Per-library account sessions for the Openshelf account core.
//!
//! A [`UserAccountSession`] owns every piece of persisted patron state for
//! one library (credential, authorization identifier, scheme selection, DRM
//! fields). Sessions are handed out by an explicit [`SessionRegistry`] so
//! there are no process-wide singletons, and state changes are announced on
//! an [`AccountEventBus`].

mod account;
mod credential;
mod events;
mod registry;
mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use account::AccountDetails;
pub use credential::Credential;
pub use events::{AccountEvent, AccountEventBus};
pub use registry::SessionRegistry;
pub use session::UserAccountSession;
