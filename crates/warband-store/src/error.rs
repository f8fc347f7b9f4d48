use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading a store file failed for a reason other than it not existing.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a store file (or creating its parent directory) failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store file exists but does not parse as the expected shape.
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing a record for disk failed.
    #[error("failed to encode store data: {0}")]
    Encode(#[source] serde_json::Error),
}
