use serde::Serialize;

use crate::platform::PlatformError;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Stale result: {0}")]
    StaleResult(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Client not found: {0}")]
    UnknownClient(String),

    #[error("Invalid client: {0}")]
    InvalidClient(String),

    #[error("Duplicate client: {0}")]
    DuplicateClient(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AccessError {
    /// Stale results are expected after a screen goes away; callers drop them.
    pub fn is_stale(&self) -> bool {
        matches!(self, AccessError::StaleResult(_))
    }
}

impl Serialize for AccessError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
