/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key cannot be mapped onto the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Stored value is not valid for its key
    #[error("Corrupt value under key {key}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization/deserialization error
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Backend lock was poisoned by a panicking writer
    #[error("Storage backend poisoned")]
    Poisoned,

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for cadence_core::CadenceError {
    fn from(err: StorageError) -> Self {
        cadence_core::CadenceError::storage(err.to_string())
    }
}
