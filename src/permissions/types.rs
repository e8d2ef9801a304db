use serde::{Deserialize, Serialize};

use crate::clients::ClientDescriptor;

/// Access state of one client, always derived from the platform.
///
/// - **NotGranted**: at least one required permission is missing.
/// - **Granted**: every required permission is held.
/// - **Revocable**: granted, and the app can drop the grant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    NotGranted,
    Granted,
    Revocable,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionState::Granted | PermissionState::Revocable)
    }
}

/// A platform permission the app can hold.
///
/// Document-tree grants are scoped to one folder and serialize as
/// "tree:{path}"; the app-wide storage permission is "storage:read".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadExternalStorage,
    DocumentTree(String),
}

const STORAGE_READ: &str = "storage:read";
const TREE_PREFIX: &str = "tree:";

impl Permission {
    pub fn document_tree(path: &str) -> Self {
        Permission::DocumentTree(normalize_tree(path))
    }

    /// Whether a tree returned by the document picker is the one this
    /// permission asks for. Always false for non-tree permissions.
    pub fn matches_tree(&self, tree: &str) -> bool {
        match self {
            Permission::DocumentTree(path) => *path == normalize_tree(tree),
            Permission::ReadExternalStorage => false,
        }
    }
}

fn normalize_tree(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::ReadExternalStorage => f.write_str(STORAGE_READ),
            Permission::DocumentTree(path) => write!(f, "{}{}", TREE_PREFIX, path),
        }
    }
}

impl Serialize for Permission {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            STORAGE_READ => Ok(Permission::ReadExternalStorage),
            _ => match s.strip_prefix(TREE_PREFIX) {
                Some(path) if !normalize_tree(path).is_empty() => {
                    Ok(Permission::document_tree(path))
                }
                _ => Err(serde::de::Error::unknown_variant(&s, &[STORAGE_READ, "tree:{path}"])),
            },
        }
    }
}

/// One row of the presentation-facing client list.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    pub client: ClientDescriptor,
    pub state: PermissionState,
}
