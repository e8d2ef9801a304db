pub mod catalog;
pub mod descriptor;
pub mod registry;

pub use catalog::{ClientCatalog, WHATSAPP, WHATSAPP_BUSINESS};
pub use descriptor::{Capability, ClientDescriptor, RevokeMode};
pub use registry::ClientRegistry;
