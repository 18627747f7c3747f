//! Flat key-value persistence
//!
//! Station list and session history are each stored as one JSON document
//! under a fixed key. Two backends: files in a data directory, or memory.

pub mod file_store;
pub mod memory_store;

use async_trait::async_trait;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

/// Key holding the JSON array of stations
pub const STATIONS_KEY: &str = "pcs";

/// Key holding the JSON array of completed sessions
pub const HISTORY_KEY: &str = "sessionHistory";

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage IO error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),

    #[error("Data directory '{path}' is not usable: {reason}")]
    DataDir { path: String, reason: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A string-valued key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` when absent
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value under `key`
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Keys become file names, so keep them to a safe alphabet
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
