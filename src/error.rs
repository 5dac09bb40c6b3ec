//! Error types for TupleStore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for TupleStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Page Errors
    // -------------------------------------------------------------------------
    /// An index rejected an add/remove event
    #[error("Index '{index}' rejected update: {reason}")]
    IndexSync { index: String, reason: String },

    /// The durable save/delete of a page failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Delete/update referenced a primary key absent from the page
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The page was emptied and its persisted image removed
    #[error("Page {0} has been destroyed")]
    PageDestroyed(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Table Errors
    // -------------------------------------------------------------------------
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Index already exists: {0}")]
    IndexExists(String),

    #[error("Invalid tuple: {0}")]
    InvalidTuple(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl StoreError {
    /// Build an `IndexSync` error for the named index
    pub fn index_sync(index: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::IndexSync {
            index: index.into(),
            reason: reason.into(),
        }
    }
}
