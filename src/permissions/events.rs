use serde::Serialize;
use tokio::sync::broadcast;

use super::types::{Permission, PermissionState};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum AccessEvent {
    #[serde(rename = "access:requested")]
    Requested {
        client_id: String,
        permission: Permission,
    },

    #[serde(rename = "access:granted")]
    Granted {
        client_id: String,
        state: PermissionState,
    },

    #[serde(rename = "access:denied")]
    Denied { client_id: String, reason: String },

    #[serde(rename = "access:revoked")]
    Revoked { client_id: String },

    /// A result arrived for a request nobody is waiting on anymore.
    #[serde(rename = "access:discarded")]
    Discarded { client_id: String, token: String },
}

/// Fan-out of access changes to whoever is listening.
///
/// Subscribing returns a receiver; dropping it unsubscribes. Sending with no
/// subscribers is fine.
pub struct AccessEvents {
    tx: broadcast::Sender<AccessEvent>,
}

impl AccessEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn emit(&self, event: AccessEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for AccessEvents {
    fn default() -> Self {
        Self::new()
    }
}
