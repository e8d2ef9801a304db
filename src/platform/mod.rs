pub mod simulated;

use serde::{Deserialize, Serialize};

use crate::permissions::Permission;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("platform unavailable: {0}")]
    Unavailable(String),

    #[error("platform rejected call: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A package reported by the platform's package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub id: String,
}

impl InstalledPackage {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

/// What the platform's grant UI handed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GrantResult {
    /// The document picker returned this tree.
    Tree { tree: String },
    /// A runtime permission dialog was accepted.
    Allowed,
    /// The user backed out of the dialog.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The platform permission API.
///
/// Every query goes to the platform; implementations must not cache grant
/// state on the caller's behalf. `launch_grant` only opens the grant UI, the
/// result arrives later through `CapabilityRequestFlow::resolve`.
pub trait Platform: Send + Sync {
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>, PlatformError>;

    fn is_granted(&self, permission: &Permission) -> Result<bool, PlatformError>;

    fn launch_grant(&self, permission: &Permission) -> Result<(), PlatformError>;

    /// Make a grant returned by the grant UI survive restarts.
    fn persist_grant(&self, permission: &Permission) -> Result<(), PlatformError>;

    /// Drop a held grant. `Ok(false)` means the platform refused.
    fn release_grant(&self, permission: &Permission) -> Result<bool, PlatformError>;
}
