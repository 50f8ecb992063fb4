use std::path::PathBuf;

/// Errors from receipt store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file exists but could not be decoded.
    #[error("corrupt receipt snapshot {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Serialization of the in-memory mapping failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Writing the snapshot to disk failed.
    #[error("failed to persist receipts to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the store lock.
    #[error("receipt store lock poisoned")]
    Poisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
