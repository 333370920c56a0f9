//! Store-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::pattern::PatternError;

/// Errors surfaced by store operations.
///
/// Missing or undecodable files are not errors: they read as empty documents.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Invalid translation key '{0}'")]
    InvalidKey(String),

    /// Write requests must be JSON objects.
    #[error("Translations must be an object, got {0}")]
    InvalidDocument(String),

    /// A file store has no base directory to create documents in.
    #[error("No translation directory to create '{0}' in")]
    NoBaseDirectory(String),

    #[error("Failed to write translation file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode translations: {0}")]
    Encode(#[from] serde_json::Error),

    /// Relational backend errors propagate unmodified.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
