//! Storage backends for structured stores.

/// File capability shared by file-backed stores
pub mod fs;
/// Relational (SQLite) backend
mod sqlite;
/// Directory-structured file backend
mod structured_file;

use std::fmt::Debug;

pub use sqlite::{
    ColumnNames,
    SqliteBackend,
};
pub use structured_file::StructuredFileBackend;

use crate::address::{
    Address,
    Scope,
};
use crate::dot::Translations;
use crate::error::StoreError;

/// A listed document: its decoded address and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<L> {
    pub address: Address,
    pub location: L,
}

/// Raw document access at concrete addresses.
///
/// Backends know nothing about fallbacks, caching or write policy; the store
/// engine drives them.
pub trait DocumentBackend: Debug + Send + Sync {
    /// Backend-specific handle to one stored document.
    type Location: Clone + Debug + Send + Sync;

    /// Lists existing documents whose address falls inside `scope`.
    ///
    /// # Errors
    /// - Backend query failure
    fn list(&self, scope: &Scope) -> Result<Vec<Entry<Self::Location>>, StoreError>;

    /// Location a new document for `address` would be created at.
    ///
    /// # Errors
    /// - The backend has nowhere to create documents
    fn locate(&self, address: &Address) -> Result<Self::Location, StoreError>;

    /// Reads and flattens one document. A missing document reads as empty.
    ///
    /// # Errors
    /// - Backend query failure
    fn read(&self, entry: &Entry<Self::Location>) -> Result<Translations, StoreError>;

    /// Persists a batch of documents, creating the ones that do not exist.
    ///
    /// # Errors
    /// - Write failure; earlier documents of the batch may already be written
    fn write(&self, batch: &[(Entry<Self::Location>, Translations)]) -> Result<(), StoreError>;

    /// Deletes one document.
    ///
    /// # Errors
    /// - Backend query failure
    fn delete(&self, entry: &Entry<Self::Location>) -> Result<(), StoreError>;
}
