use std::sync::Arc;

use super::types::{ClientStatus, Permission, PermissionState};
use crate::clients::{ClientDescriptor, ClientRegistry, RevokeMode};
use crate::platform::Platform;

/// Answers "can the app read this client's statuses" from platform state.
///
/// Holds no grant state of its own: every call queries the platform, so a
/// grant or revoke made outside the app shows up on the next query.
#[derive(Clone)]
pub struct PermissionEvaluator {
    platform: Arc<dyn Platform>,
}

impl PermissionEvaluator {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// `Granted` iff every required permission is held. A failed platform
    /// query counts as not held.
    pub fn evaluate(&self, client: &ClientDescriptor) -> PermissionState {
        let all_held = client
            .required_permissions()
            .iter()
            .all(|permission| self.holds(permission));
        if all_held {
            PermissionState::Granted
        } else {
            PermissionState::NotGranted
        }
    }

    /// Like `evaluate`, but reports `Revocable` for a granted client the app
    /// can release by itself.
    pub fn classify(&self, client: &ClientDescriptor) -> PermissionState {
        match self.evaluate(client) {
            PermissionState::Granted if client.revoke_mode == RevokeMode::Synchronous => {
                PermissionState::Revocable
            }
            state => state,
        }
    }

    /// Installed clients with their current state, in registry order.
    pub fn overview(&self, registry: &ClientRegistry) -> Vec<ClientStatus> {
        registry
            .list_clients()
            .iter()
            .map(|client| ClientStatus {
                client: client.clone(),
                state: self.classify(client),
            })
            .collect()
    }

    /// Whether statuses of at least one installed client are readable.
    pub fn has_any_access(&self, registry: &ClientRegistry) -> bool {
        registry
            .list_clients()
            .iter()
            .any(|client| self.evaluate(client).is_granted())
    }

    /// The app-wide shared storage permission, independent of any client.
    pub fn has_storage_access(&self) -> bool {
        self.holds(&Permission::ReadExternalStorage)
    }

    /// Required permissions of `client` that are not currently held.
    pub fn missing(&self, client: &ClientDescriptor) -> Vec<Permission> {
        client
            .required_permissions()
            .into_iter()
            .filter(|permission| !self.holds(permission))
            .collect()
    }

    pub(crate) fn holds(&self, permission: &Permission) -> bool {
        match self.platform.is_granted(permission) {
            Ok(granted) => granted,
            Err(e) => {
                log::warn!("Grant query for {} failed, treating as not granted: {}", permission, e);
                false
            }
        }
    }
}
