use std::collections::HashSet;
use std::sync::Arc;

use super::{ClientCatalog, ClientDescriptor};
use crate::platform::Platform;

/// The catalog clients that are installed right now.
///
/// Built empty; `refresh` fills it from the platform's package list. Order
/// follows the catalog.
pub struct ClientRegistry {
    catalog: ClientCatalog,
    platform: Arc<dyn Platform>,
    installed: Vec<ClientDescriptor>,
}

impl ClientRegistry {
    pub fn new(catalog: ClientCatalog, platform: Arc<dyn Platform>) -> Self {
        Self {
            catalog,
            platform,
            installed: Vec::new(),
        }
    }

    /// Re-scan installed packages. A failed query leaves the registry empty.
    pub fn refresh(&mut self) {
        self.installed = match self.platform.installed_packages() {
            Ok(packages) => {
                let ids: HashSet<&str> = packages.iter().map(|p| p.id.as_str()).collect();
                self.catalog
                    .iter()
                    .filter(|c| ids.contains(c.id.as_str()))
                    .cloned()
                    .collect()
            }
            Err(e) => {
                log::warn!("Installed client scan failed, treating as none installed: {}", e);
                Vec::new()
            }
        };
        log::info!(
            "Client registry refreshed: {} of {} known client(s) installed",
            self.installed.len(),
            self.catalog.len()
        );
    }

    pub fn list_clients(&self) -> &[ClientDescriptor] {
        &self.installed
    }

    pub fn get(&self, id: &str) -> Option<&ClientDescriptor> {
        self.installed.iter().find(|c| c.id == id)
    }

    pub fn is_installed(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn catalog(&self) -> &ClientCatalog {
        &self.catalog
    }

    /// The preferred client if installed, otherwise the first installed one.
    pub fn get_default_or_any(&self) -> Option<&ClientDescriptor> {
        self.catalog
            .preferred()
            .and_then(|id| self.get(id))
            .or_else(|| self.installed.first())
    }
}
