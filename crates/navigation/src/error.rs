//! Error types for storage and cross-thread delivery.
//!
//! Navigation itself never fails: the destination set is closed and
//! exhaustively matched. Only the collaborators around it can.

use std::path::PathBuf;

/// Failures of a [`KeyValueStore`](crate::storage::KeyValueStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse store contents: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] ron::Error),

    #[error("failed to encode pending action: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors surfaced by the navigation service layer.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("navigation inbox closed; the UI loop is no longer running")]
    InboxClosed,
}

pub type StorageResult<T> = Result<T, StorageError>;
