use thiserror::Error;

/// Errors raised by the portal core.
///
/// Invalid challenge input and unknown status codes are not errors; they
/// degrade silently. Only storage and lookup failures surface here.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Application not found: {0}")]
    ApplicationNotFound(String),
}

pub type Result<T> = std::result::Result<T, PortalError>;
