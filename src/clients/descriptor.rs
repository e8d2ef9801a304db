use serde::{Deserialize, Serialize};

use crate::permissions::Permission;

/// What a client needs before its statuses can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// A document-tree grant on the client's status folder.
    ScopedDocumentAccess,
    /// The app-wide shared storage read permission.
    LegacyStorage,
}

/// How a grant for this client is dropped from inside the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RevokeMode {
    /// One release call, answered immediately.
    #[default]
    Synchronous,
    /// Only the user can drop the grant, through system settings.
    Unsupported,
}

fn default_capabilities() -> Vec<Capability> {
    vec![Capability::ScopedDocumentAccess]
}

/// A recognized messaging client whose statuses the app can read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDescriptor {
    pub id: String,
    pub display_name: String,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub revoke_mode: RevokeMode,
    /// Status folder relative to the shared storage root.
    pub status_dir: String,
}

impl ClientDescriptor {
    pub fn new(id: &str, display_name: &str, status_dir: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            capabilities: default_capabilities(),
            revoke_mode: RevokeMode::default(),
            status_dir: status_dir.to_string(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_revoke_mode(mut self, revoke_mode: RevokeMode) -> Self {
        self.revoke_mode = revoke_mode;
        self
    }

    pub fn requires(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Platform permissions that must all be held, in capability order.
    /// Duplicated capabilities collapse into one permission.
    pub fn required_permissions(&self) -> Vec<Permission> {
        let mut required = Vec::with_capacity(self.capabilities.len());
        for capability in &self.capabilities {
            let permission = match capability {
                Capability::ScopedDocumentAccess => Permission::document_tree(&self.status_dir),
                Capability::LegacyStorage => Permission::ReadExternalStorage,
            };
            if !required.contains(&permission) {
                required.push(permission);
            }
        }
        required
    }

    /// The document-tree grant owned by this client, if it uses one.
    pub fn tree_permission(&self) -> Option<Permission> {
        self.requires(Capability::ScopedDocumentAccess)
            .then(|| Permission::document_tree(&self.status_dir))
    }
}
