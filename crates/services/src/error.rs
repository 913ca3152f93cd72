//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by catalog sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("catalog file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors emitted while encoding or decoding persisted snapshots.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("snapshot state is invalid: {0}")]
    Invalid(#[from] quiz_core::StateError),
}

/// Errors emitted by `QuizProgressStore` outside of the transitions themselves.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
