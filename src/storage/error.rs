//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid page schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid slot ID: {slot_id} (slots on page: {num_slots})")]
    InvalidSlotId { slot_id: usize, num_slots: usize },

    #[error("Page size mismatch: expected {expected} bytes, got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    #[error("Corrupt page: {0}")]
    CorruptPage(String),

    #[error("Page not found: {0}")]
    PageNotFound(crate::storage::page::PageId),

    #[error("Corrupt RID table: {0}")]
    CorruptRidTable(String),

    #[error("Unknown cache policy: {0}")]
    UnknownCachePolicy(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
