//! Error types for the shell core.
//!
//! This module defines the centralized error type [`ShellError`], the storage-specific
//! [`StoreError`], and a [`Result`] alias used throughout the crate. All errors are
//! implemented with `thiserror`.
//!
//! Not every failure is propagated. History recording and tab-registry operations on
//! unknown ids are defined as best-effort or no-ops; only explicit data mutations
//! (bookmarks, folders, settings) surface their errors to the bridge caller.

use thiserror::Error;

/// Failures raised by the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has not been opened, or has already been closed.
    #[error("store is not open")]
    NotOpen,

    /// The underlying SQLite driver reported an error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Moving a folder under `parent` would make it its own ancestor.
    #[error("moving folder {folder} under {parent} would create a cycle")]
    Cycle {
        /// Folder being moved.
        folder: String,
        /// Requested new parent.
        parent: String,
    },
}

/// The main error type for shell operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Durable store unavailable or an operation on it failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An operation referenced an unknown tab, bookmark or folder id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input, such as an empty search query.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Communication with the background store worker failed.
    #[error("Worker communication error: {0}")]
    Worker(String),

    /// A bridge message could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for ShellError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(StoreError::Sqlite(err))
    }
}

impl ShellError {
    /// Returns `true` when the error only reports a missing entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A specialized `Result` type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
