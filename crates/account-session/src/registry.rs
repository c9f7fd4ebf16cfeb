//! Explicit session registry.

use patron_storage::SecureStorage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::events::AccountEventBus;
use crate::session::UserAccountSession;

/// Hands out one [`UserAccountSession`] per library uuid.
///
/// The registry is the single owner of session lifetimes; callers inject it
/// wherever sessions are needed rather than reaching for process globals.
/// All sessions share one storage backend and one event bus.
pub struct SessionRegistry {
    backend: Arc<dyn SecureStorage>,
    sessions: Mutex<HashMap<String, Arc<UserAccountSession>>>,
    events: AccountEventBus,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn SecureStorage>) -> Self {
        Self {
            backend,
            sessions: Mutex::new(HashMap::new()),
            events: AccountEventBus::new(),
        }
    }

    /// The session for `library_uuid`, created on first access.
    pub fn session(&self, library_uuid: &str) -> Arc<UserAccountSession> {
        let mut sessions = self.sessions.lock().expect("sessions lock poisoned");
        sessions
            .entry(library_uuid.to_string())
            .or_insert_with(|| {
                debug!(library = %library_uuid, "Creating account session");
                Arc::new(UserAccountSession::new(self.backend.clone(), library_uuid))
            })
            .clone()
    }

    pub fn events(&self) -> &AccountEventBus {
        &self.events
    }
}
