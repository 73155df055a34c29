//! Error types for the invex-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the invex library.
///
/// The `parse` entry point itself is infallible and reports problems through
/// the result envelope; these errors cover the fallible edges of the crate,
/// the pattern store and configuration files.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Pattern store error.
    #[error("pattern store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to the advisory pattern store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read the store file.
    #[error("failed to read store at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON or has an unexpected shape.
    #[error("malformed store document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The store document carries a version this build does not understand.
    #[error("unsupported store version: {0}")]
    UnsupportedVersion(u32),

    /// Failed to write the store file.
    #[error("failed to write store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
