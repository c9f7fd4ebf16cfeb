//! Account state change broadcasts.

use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

/// Events announced when account state changes.
#[derive(Debug, Clone)]
pub enum AccountEvent {
    SignedIn {
        library: String,
    },
    SignedOut {
        library: String,
    },
    ValidationFailed {
        library: String,
        title: Option<String>,
        message: Option<String>,
    },
    SyncPermissionChanged {
        library: String,
        granted: bool,
    },
}

/// Broadcast channel for [`AccountEvent`]s.
///
/// Publishing never blocks and never fails; events sent while no receiver
/// is subscribed are simply dropped.
#[derive(Clone)]
pub struct AccountEventBus {
    tx: broadcast::Sender<AccountEvent>,
}

impl AccountEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: AccountEvent) {
        debug!(event = ?event, "Publishing account event");
        let _ = self.tx.send(event);
    }
}

impl Default for AccountEventBus {
    fn default() -> Self {
        Self::new()
    }
}
