use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    #[error("Stored value for '{key}' is malformed: {message}")]
    Malformed { key: String, message: String },

    #[error("Media operation rejected: {0}")]
    MediaRejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the failure comes from the storage backend itself
    /// (unavailable, full, or unreadable) rather than from the caller.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::NotAvailable(_)
                | BridgeError::QuotaExceeded { .. }
                | BridgeError::Malformed { .. }
                | BridgeError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
