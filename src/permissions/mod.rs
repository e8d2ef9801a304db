pub mod evaluator;
pub mod events;
pub mod request;
pub mod types;

pub use evaluator::PermissionEvaluator;
pub use events::{AccessEvent, AccessEvents};
pub use request::{
    CapabilityRequest, CapabilityRequestFlow, RequestOutcome, RequestPhase, Screen,
    STORAGE_SUBJECT,
};
pub use types::{ClientStatus, Permission, PermissionState};
