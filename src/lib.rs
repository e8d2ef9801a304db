pub mod clients;
pub mod error;
pub mod permissions;
pub mod platform;

pub use clients::{ClientCatalog, ClientDescriptor, ClientRegistry};
pub use error::{AccessError, AccessResult};
pub use permissions::{CapabilityRequestFlow, PermissionEvaluator, PermissionState, Screen};
pub use platform::{GrantResult, Platform};
