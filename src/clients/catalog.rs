use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ClientDescriptor;
use crate::error::{AccessError, AccessResult};
use crate::permissions::{Permission, STORAGE_SUBJECT};

pub const CATALOG_FILE: &str = "clients.json";

pub const WHATSAPP: &str = "com.whatsapp";
pub const WHATSAPP_BUSINESS: &str = "com.whatsapp.w4b";

/// The clients the app knows how to read, in display order.
///
/// Ids are unique. `preferred` names the client used for quick launch when
/// it is installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCatalog {
    clients: Vec<ClientDescriptor>,
    #[serde(default)]
    preferred: Option<String>,
}

impl ClientCatalog {
    pub fn new(clients: Vec<ClientDescriptor>, preferred: Option<String>) -> AccessResult<Self> {
        let catalog = Self { clients, preferred };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn builtin() -> Self {
        Self {
            clients: vec![
                ClientDescriptor::new(
                    WHATSAPP,
                    "WhatsApp",
                    "Android/media/com.whatsapp/WhatsApp/Media/.Statuses",
                ),
                ClientDescriptor::new(
                    WHATSAPP_BUSINESS,
                    "WhatsApp Business",
                    "Android/media/com.whatsapp.w4b/WhatsApp Business/Media/.Statuses",
                ),
            ],
            preferred: Some(WHATSAPP.to_string()),
        }
    }

    /// Read `clients.json` from the data directory, falling back to the
    /// built-in catalog when the file is absent.
    pub fn load(data_dir: &Path) -> AccessResult<Self> {
        let path = data_dir.join(CATALOG_FILE);
        if !path.exists() {
            log::debug!("No {} in {}, using built-in clients", CATALOG_FILE, data_dir.display());
            return Ok(Self::builtin());
        }
        let data = std::fs::read_to_string(&path)?;
        let catalog: ClientCatalog = serde_json::from_str(&data)?;
        catalog.validate()?;
        log::info!("Loaded {} client(s) from {}", catalog.clients.len(), path.display());
        Ok(catalog)
    }

    fn validate(&self) -> AccessResult<()> {
        for (i, client) in self.clients.iter().enumerate() {
            Self::validate_client(client)?;
            if self.clients[..i].iter().any(|c| c.id == client.id) {
                return Err(AccessError::DuplicateClient(client.id.clone()));
            }
        }
        if let Some(ref preferred) = self.preferred {
            if self.get(preferred).is_none() {
                return Err(AccessError::UnknownClient(preferred.clone()));
            }
        }
        Ok(())
    }

    fn validate_client(client: &ClientDescriptor) -> AccessResult<()> {
        if client.id.trim().is_empty() {
            return Err(AccessError::InvalidClient("client id is blank".to_string()));
        }
        if client.id == STORAGE_SUBJECT {
            return Err(AccessError::InvalidClient(format!(
                "{} is reserved for shared storage access",
                client.id
            )));
        }
        // An empty tree would match the storage root.
        if let Some(Permission::DocumentTree(path)) = client.tree_permission() {
            if path.is_empty() {
                return Err(AccessError::InvalidClient(format!(
                    "{} needs a status_dir for scoped access",
                    client.id
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ClientDescriptor> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientDescriptor> {
        self.clients.iter()
    }

    pub fn preferred(&self) -> Option<&str> {
        self.preferred.as_deref()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
